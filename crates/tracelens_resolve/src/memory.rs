//! Paged memory state.

use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracelens_core::{Error, Result};
use tracelens_log::MemoryWrite;

/// State of every traced memory pool at one point in a capture
///
/// Memory is held in fixed-size pages keyed by `(pool, page number)`.
/// Pages are shared between snapshots and copied on first write, so
/// deriving the next snapshot from a cached one costs only the pages the
/// replayed atoms touch. Bytes never written read as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySnapshot {
    page_size: u64,
    pages: BTreeMap<(u32, u64), Arc<Vec<u8>>>,
}

impl MemorySnapshot {
    /// Empty memory with `page_size`-byte pages
    #[must_use]
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size: page_size.max(1),
            pages: BTreeMap::new(),
        }
    }

    /// Number of pages ever written
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whether nothing has been written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Apply a recorded memory observation
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the write runs past the end of the address space
    pub fn apply(&mut self, write: &MemoryWrite) -> Result<()> {
        self.write(write.pool, write.address, &write.data)
    }

    /// Copy `data` into `pool` starting at `address`
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the write runs past the end of the address space
    pub fn write(&mut self, pool: u32, address: u64, data: &[u8]) -> Result<()> {
        check_span(address, data.len() as u64)?;

        let page_size = self.page_size;
        let mut offset = 0usize;
        while offset < data.len() {
            let at = address + offset as u64;
            let within = (at % page_size) as usize;
            let count = (page_size as usize - within).min(data.len() - offset);

            let page = self
                .pages
                .entry((pool, at / page_size))
                .or_insert_with(|| Arc::new(vec![0; page_size as usize]));
            Arc::make_mut(page)[within..within + count]
                .copy_from_slice(&data[offset..offset + count]);

            offset += count;
        }
        Ok(())
    }

    /// Read `size` bytes of `pool` starting at `address`
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the range runs past the end of the address space
    pub fn read(&self, pool: u32, address: u64, size: u64) -> Result<Bytes> {
        check_span(address, size)?;

        let page_size = self.page_size;
        let mut out = vec![0u8; size as usize];
        let mut offset = 0usize;
        while offset < out.len() {
            let at = address + offset as u64;
            let within = (at % page_size) as usize;
            let count = (page_size as usize - within).min(out.len() - offset);

            if let Some(page) = self.pages.get(&(pool, at / page_size)) {
                out[offset..offset + count].copy_from_slice(&page[within..within + count]);
            }
            offset += count;
        }
        Ok(Bytes::from(out))
    }
}

fn check_span(address: u64, size: u64) -> Result<()> {
    match address.checked_add(size) {
        Some(_) => Ok(()),
        None => Err(Error::OutOfRange {
            what: "memory address".to_string(),
            index: address,
            len: u64::MAX - size,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unwritten_memory_reads_zero() {
        let memory = MemorySnapshot::new(16);
        assert_eq!(memory.read(0, 100, 4).unwrap(), Bytes::from_static(&[0, 0, 0, 0]));
        assert!(memory.is_empty());
    }

    #[test]
    fn test_write_across_pages() {
        let mut memory = MemorySnapshot::new(4);
        memory.write(1, 2, &[1, 2, 3, 4, 5, 6]).unwrap();

        assert_eq!(memory.page_count(), 2);
        assert_eq!(
            memory.read(1, 0, 8).unwrap(),
            Bytes::from_static(&[0, 0, 1, 2, 3, 4, 5, 6])
        );
        assert_eq!(memory.read(0, 2, 2).unwrap(), Bytes::from_static(&[0, 0]));
    }

    #[test]
    fn test_clone_is_copy_on_write() {
        let mut before = MemorySnapshot::new(8);
        before.write(0, 0, &[1; 8]).unwrap();

        let mut after = before.clone();
        after.write(0, 4, &[2; 2]).unwrap();

        assert_eq!(before.read(0, 4, 2).unwrap(), Bytes::from_static(&[1, 1]));
        assert_eq!(after.read(0, 4, 2).unwrap(), Bytes::from_static(&[2, 2]));
    }

    #[test]
    fn test_address_overflow() {
        let mut memory = MemorySnapshot::new(8);
        assert!(matches!(
            memory.write(0, u64::MAX - 1, &[0; 4]),
            Err(Error::OutOfRange { .. })
        ));
        assert!(memory.read(0, u64::MAX, 2).is_err());
    }

    proptest! {
        #[test]
        fn prop_read_returns_last_write(
            page_size in 1u64..64,
            address in 0u64..1024,
            first in proptest::collection::vec(any::<u8>(), 1..128),
            second in proptest::collection::vec(any::<u8>(), 1..128),
        ) {
            let mut memory = MemorySnapshot::new(page_size);
            memory.write(3, address, &first).unwrap();
            memory.write(3, address, &second).unwrap();

            let read = memory.read(3, address, second.len() as u64).unwrap();
            prop_assert_eq!(&read[..], &second[..]);

            if first.len() > second.len() {
                let tail = memory
                    .read(3, address + second.len() as u64, (first.len() - second.len()) as u64)
                    .unwrap();
                prop_assert_eq!(&tail[..], &first[second.len()..]);
            }
        }
    }
}
