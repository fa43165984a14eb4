//! The fixed size-class table used to bucket free blocks.

/// Strictly increasing power-of-two thresholds, topping out around 1 MiB.
/// A free block's class is the first threshold greater than or equal to its
/// size; anything larger lands in the implicit overflow bucket at
/// [`OVERFLOW_CLASS`].
pub const SIZE_CLASSES: &[usize] = &[
    32, 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768, 65536, 131072, 262144, 524288,
    1048576,
];

/// Index of the overflow bucket, one past the last real size class.
pub const OVERFLOW_CLASS: usize = SIZE_CLASSES.len();

/// Number of buckets a free-list index needs: one per size class, plus
/// overflow.
pub const BUCKET_COUNT: usize = SIZE_CLASSES.len() + 1;

/// Classifies `size` into a bucket index.
///
/// Returns the index of the first threshold `>= size`, or [`OVERFLOW_CLASS`]
/// if `size` exceeds the largest threshold. Ties favor the smaller index.
#[inline]
pub const fn classify(size: usize) -> usize {
    let mut i = 0;
    while i < SIZE_CLASSES.len() {
        if size <= SIZE_CLASSES[i] {
            return i;
        }
        i += 1;
    }
    OVERFLOW_CLASS
}
