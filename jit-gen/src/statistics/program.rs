use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Default, Debug, Clone, Deserialize, Serialize)]
pub struct ProgramStatistics {
    pub node_counter: BTreeMap<String, usize>,
    /// Binary and unary operators by symbol.
    pub operator_counter: BTreeMap<String, usize>,
    pub total_nodes: usize,
    pub complexity: usize,
    pub cfg_depth: usize,
}
