use thiserror::Error;
use verdant_core::ContentError;

use crate::entity::EntityRef;

/// Failures that abort a simulation tick.
///
/// Expected gameplay outcomes (blocked movement, nothing to hit) are not
/// errors; these variants mean the content contract or an entity reference
/// was broken.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("unknown projectile kind '{0}'")]
    UnknownProjectileKind(String),
    #[error("entity {0:?} does not exist")]
    MissingEntity(EntityRef),
    #[error("no player in the world")]
    NoPlayer,
}
