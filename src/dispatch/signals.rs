/// Point-in-time view of the dispatcher's permit pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflightSnapshot {
    pub max: usize,
    pub available: usize,
    pub in_use: usize,
}
