use crate::hierarchy::NodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DynamicsError {
    #[error("a dynamics manager already exists in this process")]
    ManagerAlreadyExists,
    #[error("structure is already registered with the manager")]
    DuplicateRegistration,
    #[error("structure is not registered with the manager")]
    NotRegistered,
    #[error("node {0:?} does not belong to the hierarchy")]
    UnknownNode(NodeId),
    #[error("particle {0} does not exist")]
    UnknownParticle(usize),
    #[error("link {0} does not exist")]
    UnknownLink(usize),
    #[error("collider {0} does not exist")]
    UnknownCollider(usize),
}
