//! Permission policy predicates.

use thiserror::Error;

use crate::context::ResolvedContext;

/// Requirements a command handler declares at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requirements {
    /// Sender must be in the owner set (or the sub-session's designated
    /// owner).
    pub owner: bool,

    /// Sender must hold a group-admin role. Owners bypass this.
    pub user_admin: bool,

    /// The bot itself must hold a group-admin role. Not bypassed by
    /// ownership - the bot genuinely needs the protocol-level role.
    pub bot_admin: bool,
}

impl Requirements {
    /// Whether evaluating these requirements needs group metadata at all.
    pub fn needs_group_meta(&self) -> bool {
        self.user_admin || self.bot_admin
    }
}

/// Why a permission gate failed. The display form is the user-facing
/// denial message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("Only bot owners can use this command.")]
    OwnerOnly,

    #[error("Only group admins can use this command.")]
    AdminOnly,

    #[error("I need to be a group admin to run this command.")]
    BotNotAdmin,

    #[error("This command only works in groups.")]
    GroupOnly,
}

/// Evaluate a handler's requirements against a resolved context.
///
/// Requirements combine with AND; the first failing check determines the
/// denial shown to the user (owner first, then group-context checks).
/// Admin requirements in a direct chat are an automatic `GroupOnly`
/// denial, never treated as passed.
pub fn evaluate(req: &Requirements, ctx: &ResolvedContext) -> Result<(), Denial> {
    if req.owner && !ctx.is_owner {
        return Err(Denial::OwnerOnly);
    }

    if ctx.is_group {
        if req.user_admin && !ctx.is_owner && !ctx.sender_is_admin {
            return Err(Denial::AdminOnly);
        }
        if req.bot_admin && !ctx.bot_is_admin {
            return Err(Denial::BotNotAdmin);
        }
    } else if req.needs_group_meta() {
        return Err(Denial::GroupOnly);
    }

    Ok(())
}
