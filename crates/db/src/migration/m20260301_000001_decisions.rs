//! Decisions and revocation requests.
//!
//! Creates the status enums, both tables, their indexes and the tenant
//! isolation policies keyed on `app.current_business_profile_id`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TABLES
        // ============================================================
        db.execute_unprepared(DECISIONS_SQL).await?;
        db.execute_unprepared(REVOCATION_REQUESTS_SQL).await?;

        // ============================================================
        // PART 3: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        // ============================================================
        // PART 4: ROW LEVEL SECURITY
        // ============================================================
        db.execute_unprepared(RLS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Decision lifecycle; everything but 'active' is set by the revocation workflow
CREATE TYPE decision_status AS ENUM (
    'active',
    'revoke_requested',
    'revoked',
    'revoke_rejected'
);

-- Revocation request lifecycle
CREATE TYPE revocation_status AS ENUM (
    'pending',
    'pending_verification',
    'verified',
    'approved',
    'rejected',
    'cancelled'
);
";

const DECISIONS_SQL: &str = r"
CREATE TABLE decisions (
    id                  UUID PRIMARY KEY,
    business_profile_id UUID NOT NULL,
    number              VARCHAR(64) NOT NULL,
    title               VARCHAR(500) NOT NULL,
    content             TEXT,
    adopted_on          DATE NOT NULL,
    status              decision_status NOT NULL DEFAULT 'active',
    created_by          UUID NOT NULL,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_decisions_number UNIQUE (business_profile_id, number)
);

CREATE INDEX idx_decisions_profile_status ON decisions(business_profile_id, status);
CREATE INDEX idx_decisions_adopted_on ON decisions(business_profile_id, adopted_on DESC);
";

const REVOCATION_REQUESTS_SQL: &str = r"
CREATE TABLE revocation_requests (
    id                     UUID PRIMARY KEY,
    decision_id            UUID NOT NULL REFERENCES decisions(id) ON DELETE CASCADE,
    business_profile_id    UUID NOT NULL,
    reason                 TEXT NOT NULL CHECK (length(btrim(reason)) > 0),
    requested_by           UUID NOT NULL,
    requested_at           TIMESTAMPTZ NOT NULL,

    -- Ordered list of approver user ids, no duplicates
    required_approvers     JSONB NOT NULL CHECK (jsonb_array_length(required_approvers) > 0),
    -- Ordered list of {user_id, approved_at, signature}
    approvals              JSONB NOT NULL DEFAULT '[]'::jsonb,
    signature_verification JSONB,

    document_url           TEXT,
    document_name          VARCHAR(255),
    document_storage_key   VARCHAR(1024),
    document_content_type  VARCHAR(100),
    document_size          BIGINT,
    document_uploaded_by   UUID,
    document_uploaded_at   TIMESTAMPTZ,

    status                 revocation_status NOT NULL,
    resolved_at            TIMESTAMPTZ,
    resolved_by            UUID,
    resolution_notes       TEXT,

    version                INTEGER NOT NULL DEFAULT 0,
    created_at             TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at             TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_resolution_on_terminal CHECK (
        (status IN ('approved', 'rejected', 'cancelled')) = (resolved_at IS NOT NULL)
    )
);

CREATE INDEX idx_revocation_requests_decision
    ON revocation_requests(business_profile_id, decision_id, requested_at DESC);

-- At most one open request per decision
CREATE UNIQUE INDEX uq_revocation_requests_open
    ON revocation_requests(decision_id)
    WHERE status IN ('pending', 'pending_verification', 'verified');
";

const TRIGGERS_SQL: &str = r"
-- Terminal requests are immutable
CREATE OR REPLACE FUNCTION prevent_terminal_revocation_update()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status IN ('approved', 'rejected', 'cancelled') THEN
        RAISE EXCEPTION 'revocation request % is in terminal status %', OLD.id, OLD.status;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_revocation_terminal_immutable
BEFORE UPDATE ON revocation_requests
FOR EACH ROW EXECUTE FUNCTION prevent_terminal_revocation_update();
";

const RLS_SQL: &str = r"
ALTER TABLE decisions ENABLE ROW LEVEL SECURITY;
ALTER TABLE revocation_requests ENABLE ROW LEVEL SECURITY;

-- Policies apply to the table owner too
ALTER TABLE decisions FORCE ROW LEVEL SECURITY;
ALTER TABLE revocation_requests FORCE ROW LEVEL SECURITY;

-- Application sets context per transaction: SET LOCAL app.current_business_profile_id = 'uuid';
CREATE POLICY tenant_isolation ON decisions
    USING (business_profile_id = current_setting('app.current_business_profile_id', true)::UUID);

CREATE POLICY tenant_isolation ON revocation_requests
    USING (business_profile_id = current_setting('app.current_business_profile_id', true)::UUID);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS revocation_requests;
DROP TABLE IF EXISTS decisions;
DROP FUNCTION IF EXISTS prevent_terminal_revocation_update();
DROP TYPE IF EXISTS revocation_status;
DROP TYPE IF EXISTS decision_status;
";
