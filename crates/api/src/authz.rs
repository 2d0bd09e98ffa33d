//! API-side authorization gate.
//!
//! Every gated handler calls [`require`] first, before touching any
//! service, so a denied request never reaches business logic.

use taskdesk_auth::{AccessPolicy, Operation, Principal};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

/// Check `op` for the request's principal and hand it back on success.
pub fn require(
    policy: &AccessPolicy,
    ctx: &PrincipalContext,
    op: Operation,
) -> Result<Principal, ApiError> {
    policy.authorize(op, ctx.principal())?;
    Ok(ctx.require()?.clone())
}
