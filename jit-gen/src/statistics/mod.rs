pub mod generation;
pub mod program;
pub mod visitor;

use crate::statistics::generation::GenerationStatistics;
use crate::statistics::program::ProgramStatistics;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Deserialize, Serialize)]
pub struct FullStatistics {
    pub generation_statistics: GenerationStatistics,
    pub program_statistics: ProgramStatistics,
}
