use crate::VertexData;
use anyhow::{Context, Result};
use meshopt::{SimplifyOptions, VertexDataAdapter, simplify_sloppy};

/// A level has to shed at least 5% of its indices to count as progress.
pub const MIN_PROGRESS_RATIO: f32 = 0.95;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SimplifyStrategy {
    /// Edge-collapse simplification that keeps topology and attribute seams.
    Standard,
    /// Topology-agnostic fallback that only aims for the target count.
    Sloppy,
}

#[derive(Clone, Debug)]
pub struct SimplifyOutcome {
    pub indices: Vec<u32>,
    pub error: f32,
    pub strategy: SimplifyStrategy,
}

impl SimplifyOutcome {
    pub fn made_progress(&self, input_len: usize) -> bool {
        !self.indices.is_empty() && is_progress(self.indices.len(), input_len)
    }
}

fn is_progress(output_len: usize, input_len: usize) -> bool {
    (output_len as f32) < input_len as f32 * MIN_PROGRESS_RATIO
}

pub(crate) fn position_adapter(vertices: &[VertexData]) -> Result<VertexDataAdapter<'_>> {
    VertexDataAdapter::new(
        bytemuck::cast_slice(vertices),
        std::mem::size_of::<VertexData>(),
        std::mem::offset_of!(VertexData, position),
    )
    .context("Failed to create vertex adapter")
}

/// Reduces `indices` toward `target_index_count`.
///
/// Standard simplification runs first; if it keeps 95% or more of the input
/// the sloppy variant is tried with twice the error budget. The caller
/// decides what a non-progressing outcome means.
pub fn simplify(
    vertices: &[VertexData],
    indices: &[u32],
    target_index_count: usize,
    target_error: f32,
    lock_borders: bool,
) -> Result<SimplifyOutcome> {
    let adapter = position_adapter(vertices)?;

    let options = if lock_borders {
        SimplifyOptions::LockBorder
    } else {
        SimplifyOptions::None
    };

    let mut error = 0.0f32;
    let simplified = meshopt::simplify(
        indices,
        &adapter,
        target_index_count,
        target_error,
        options,
        Some(&mut error),
    );

    if is_progress(simplified.len(), indices.len()) {
        return Ok(SimplifyOutcome {
            indices: simplified,
            error,
            strategy: SimplifyStrategy::Standard,
        });
    }

    log::debug!(
        "Standard simplification stalled at {}/{} indices, falling back to sloppy",
        simplified.len(),
        indices.len()
    );

    let mut sloppy_error = 0.0f32;
    let sloppy = simplify_sloppy(
        indices,
        &adapter,
        target_index_count,
        target_error * 2.0,
        Some(&mut sloppy_error),
    );

    Ok(SimplifyOutcome {
        indices: sloppy,
        error: sloppy_error,
        strategy: SimplifyStrategy::Sloppy,
    })
}
