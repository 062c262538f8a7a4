//! Deterministic shard assignment over segment lists.

use super::SegmentDescriptor;
use crate::ShardSpec;

/// Shard owning the segment with relative path `rel`, for `count` shards.
///
/// Depends only on the path, so a segment keeps its shard when others are added or removed.
pub fn shard_of(rel: &str, count: usize) -> usize {
    let hash = blake3::hash(rel.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash.as_bytes()[..8]);
    (u64::from_le_bytes(head) % count.max(1) as u64) as usize
}

/// Keep only segments owned by `shard.current`. Inactive specs return the list unchanged.
pub fn shard_segments(segments: Vec<SegmentDescriptor>, shard: ShardSpec) -> Vec<SegmentDescriptor> {
    if !shard.is_active() {
        return segments;
    }
    segments
        .into_iter()
        .filter(|s| shard_of(&s.rel, shard.count) == shard.current)
        .collect()
}
