//! A target that deliberately keeps memory alive after it returns.

use parking_lot::Mutex;

/// Blocks kept reachable for the rest of the process, so nothing the caller
/// holds refers to them.
static RETAINED: Mutex<Vec<Box<[u8]>>> = Mutex::new(Vec::new());

/// Retain `leak_bytes` bytes in blocks of at most `chunk_bytes`.
///
/// Returns the number of bytes retained by this call.
pub fn create_memory_leak(leak_bytes: usize, chunk_bytes: usize) -> usize {
    let chunk_bytes = chunk_bytes.max(1);
    let mut remaining = leak_bytes;
    let mut retained = RETAINED.lock();

    while remaining > 0 {
        let block = remaining.min(chunk_bytes);
        retained.push(vec![b'X'; block].into_boxed_slice());
        remaining = remaining.saturating_sub(block);
    }

    leak_bytes
}

/// Total bytes held by every call so far.
#[must_use]
pub fn retained_bytes() -> usize {
    RETAINED.lock().iter().map(|block| block.len()).sum()
}

/// Number of blocks held by every call so far.
#[must_use]
pub fn retained_blocks() -> usize {
    RETAINED.lock().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_leak_is_split_into_chunks() {
        let blocks_before = retained_blocks();
        let bytes_before = retained_bytes();

        assert_eq!(create_memory_leak(10_000, 4096), 10_000);

        assert_eq!(retained_blocks().saturating_sub(blocks_before), 3);
        assert_eq!(retained_bytes().saturating_sub(bytes_before), 10_000);
    }

    #[test]
    #[serial]
    fn test_zero_leak_retains_nothing() {
        let blocks_before = retained_blocks();
        assert_eq!(create_memory_leak(0, 4096), 0);
        assert_eq!(retained_blocks(), blocks_before);
    }
}
