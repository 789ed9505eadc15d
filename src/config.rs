//! Explicit configuration, replacing the original C source's process-global
//! `uopt` with a value threaded through every facade call.

use std::path::PathBuf;

/// One branch root of the union filesystem.
#[derive(Debug, Clone)]
pub struct BranchConfig {
    pub path: PathBuf,
}

impl BranchConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        BranchConfig { path: path.into() }
    }
}

/// Runtime configuration consulted by every facade entry point.
///
/// `branches.len()` stands in for the original `nbranches`; COWOLF requires
/// exactly two: index 0 is the upper (read-write) branch, index 1 is the
/// lower (read-only) branch.
#[derive(Debug, Clone)]
pub struct CowolfConfig {
    pub cow_enabled: bool,
    pub cowolf_enabled: bool,
    pub cowolf_fsize_th: u64,
    pub branches: Vec<BranchConfig>,
}

impl CowolfConfig {
    pub fn new(branches: Vec<BranchConfig>, cowolf_fsize_th: u64) -> Self {
        CowolfConfig {
            cow_enabled: true,
            cowolf_enabled: true,
            cowolf_fsize_th,
            branches,
        }
    }

    /// Equivalent to `check_cowolfability`: all four conditions must hold.
    pub fn is_eligible(&self, file_size: u64) -> bool {
        self.cow_enabled
            && self.cowolf_enabled
            && self.branches.len() == 2
            && file_size >= self.cowolf_fsize_th
    }

    pub fn upper(&self) -> &BranchConfig {
        &self.branches[0]
    }

    pub fn lower(&self) -> &BranchConfig {
        &self.branches[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(cow: bool, cowolf: bool, nbranches: usize, th: u64) -> CowolfConfig {
        let branches = (0..nbranches).map(|_| BranchConfig::new("/tmp")).collect();
        CowolfConfig {
            cow_enabled: cow,
            cowolf_enabled: cowolf,
            cowolf_fsize_th: th,
            branches,
        }
    }

    #[test]
    fn eligibility_truth_table() {
        for &cow in &[true, false] {
            for &cowolf in &[true, false] {
                for &nbranches in &[0usize, 1, 2, 3] {
                    for &size in &[0u64, 50, 100, 200] {
                        let c = cfg(cow, cowolf, nbranches, 100);
                        let expected = cow && cowolf && nbranches == 2 && size >= 100;
                        assert_eq!(c.is_eligible(size), expected, "{cow} {cowolf} {nbranches} {size}");
                    }
                }
            }
        }
    }
}
