pub mod graph_size_limit_constants {
    pub const MAX_NODES: u64 = 1_000_000;
    pub const MAX_PARTIES: u64 = 1024;
    pub const MAX_NAME_LENGTH: usize = 256;
}
