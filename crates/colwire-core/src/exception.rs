//! Server-side exception delivered in place of a data block.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::block::Block;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerException {
    pub code: i32,
    pub name: String,
    pub message: String,
}

impl fmt::Display for ServerException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code {}: {}: {}", self.code, self.name, self.message)
    }
}

impl std::error::Error for ServerException {}

/// One item of a result stream: a block, or the terminal exception packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Data(Block),
    Exception(ServerException),
}

impl From<Block> for Packet {
    fn from(block: Block) -> Self {
        Packet::Data(block)
    }
}
