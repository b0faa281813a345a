use crate::emit::EmitConfiguration;
use crate::error::{Result, ShuffleError};
use crate::key::{Payload, RangeKey};

/// Temporary key/value buffers used by one partitioning call.
///
/// Sized from the memory-requirement query: one key buffer and one value
/// buffer, each able to hold the whole batch. Contents are meaningless
/// between calls.
#[derive(Debug, Clone)]
pub struct Scratch<K: RangeKey, V: Payload> {
    keys: Vec<K>,
    vals: Vec<V>,
}

impl<K: RangeKey, V: Payload> Scratch<K, V> {
    /// Scratch able to hold `items` pairs.
    pub fn with_capacity(items: usize) -> Self {
        Self {
            keys: vec![K::default(); items],
            vals: vec![V::default(); items],
        }
    }

    /// Scratch covering every pair the batch described by `emit` can hold.
    pub fn for_emit(emit: &EmitConfiguration) -> Self {
        let key_items = items_in::<K>(emit.key_space(), emit.num_items());
        let val_items = items_in::<V>(emit.value_space(), emit.num_items());
        Self {
            keys: vec![K::default(); key_items],
            vals: vec![V::default(); val_items],
        }
    }

    /// Number of pairs this scratch can hold.
    pub fn capacity(&self) -> usize {
        self.keys.len().min(self.vals.len())
    }

    /// Size of the scratch region in bytes.
    pub fn size_bytes(&self) -> usize {
        self.keys.len() * std::mem::size_of::<K>() + self.vals.len() * std::mem::size_of::<V>()
    }

    /// Fail unless this scratch can hold `items` pairs.
    pub fn ensure(&self, items: usize) -> Result<()> {
        if self.capacity() < items {
            return Err(ShuffleError::ScratchTooSmall {
                required: items * (std::mem::size_of::<K>() + std::mem::size_of::<V>()),
                actual: self.size_bytes(),
            });
        }
        Ok(())
    }

    /// The first `items` slots of both temp buffers.
    pub(crate) fn split_mut(&mut self, items: usize) -> (&mut [K], &mut [V]) {
        (&mut self.keys[..items], &mut self.vals[..items])
    }
}

/// Elements of `T` that fit in `bytes`. Zero-sized types take no space, so
/// they fall back to the batch's item count.
fn items_in<T>(bytes: usize, items: usize) -> usize {
    match std::mem::size_of::<T>() {
        0 => items,
        size => bytes / size,
    }
}
