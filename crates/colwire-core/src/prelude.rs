pub use crate::block::{Block, Column, ColumnData};
pub use crate::config::{PipelineConfig, Settings};
pub use crate::error::{Error, Result};
pub use crate::exception::{Packet, ServerException};
pub use crate::schema::{DataType, Field, Schema};
pub use crate::types::Scalar;
