/// Reorders triangles for post-transform cache reuse. Topology and vertex
/// data are untouched; the output is a permutation of the input triangles.
pub fn optimize_vertex_cache(indices: &[u32], vertex_count: usize) -> Vec<u32> {
    if indices.is_empty() {
        return Vec::new();
    }
    meshopt::optimize_vertex_cache(indices, vertex_count)
}

/// Average cache miss ratio for a 16-entry FIFO cache (lower is better, 0.5
/// is the ideal for a regular grid).
pub fn average_cache_miss_ratio(indices: &[u32], vertex_count: usize) -> f32 {
    if indices.is_empty() {
        return 0.0;
    }
    meshopt::analyze_vertex_cache(indices, vertex_count, 16, 0, 0).acmr
}
