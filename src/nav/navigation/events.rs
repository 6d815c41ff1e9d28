use bevy::prelude::*;

use crate::nav::coord::CellRect;

/// Sent after the service rebuilds or drops its flow field.
///
/// `region` is `None` when the last target disappeared and the field was
/// invalidated.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowFieldRebuilt {
    pub region: Option<CellRect>,
}
