//! Traditional SYSV ELF hash table
//!
//! Layout: two 4-byte header words `[nbucket, nchain]`, then `nbucket` bucket
//! slots, then `nchain` chain slots, all 4 bytes wide.

/// Header structure for SYSV ELF hash tables
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ElfHashHeader {
    /// Number of bucket entries in the hash table
    nbucket: u32,

    /// Number of chain entries in the hash table
    nchain: u32,
}

const HEADER_SIZE: usize = size_of::<ElfHashHeader>();

/// Decoded view of a SYSV hash table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHash {
    /// Hash table header containing metadata
    header: ElfHashHeader,

    /// Address of the bucket array
    buckets: usize,

    /// Address of the chain array
    chains: usize,
}

impl ElfHash {
    /// Parse a SYSV hash table located at `addr`.
    ///
    /// # Safety
    /// The two header words at `addr` must be readable.
    #[inline]
    pub unsafe fn parse(addr: usize) -> ElfHash {
        let words = addr as *const u32;
        let header = unsafe {
            ElfHashHeader {
                nbucket: u32::from_le(words.read_unaligned()),
                nchain: u32::from_le(words.add(1).read_unaligned()),
            }
        };
        let bucket_size = header.nbucket as usize * size_of::<u32>();

        let buckets = addr.wrapping_add(HEADER_SIZE);
        let chains = buckets.wrapping_add(bucket_size);
        ElfHash {
            header,
            buckets,
            chains,
        }
    }

    #[inline]
    pub fn nbucket(&self) -> usize {
        self.header.nbucket as usize
    }

    /// Number of chain entries, which is also the number of symbols.
    #[inline]
    pub fn nchain(&self) -> usize {
        self.header.nchain as usize
    }

    #[inline]
    pub fn buckets(&self) -> usize {
        self.buckets
    }

    #[inline]
    pub fn chains(&self) -> usize {
        self.chains
    }
}
