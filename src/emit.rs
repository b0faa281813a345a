use crate::error::{Result, ShuffleError};
use crate::types::GridDims;

/// Buffer-space description of one batch emitted by the map phase.
///
/// `key_space` and `value_space` are byte sizes of the batch's key and value
/// buffers. They size the scratch region the partitioner asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitConfiguration {
    key_space: usize,
    value_space: usize,
    grid: GridDims,
    items: usize,
}

impl EmitConfiguration {
    /// Fails with `GridTooLarge` if `grid` holds more items than a `usize`.
    pub fn new(key_space: usize, value_space: usize, grid: GridDims) -> Result<Self> {
        let items = grid
            .num_items()
            .ok_or_else(|| ShuffleError::grid_too_large(grid))?;
        Ok(Self {
            key_space,
            value_space,
            grid,
            items,
        })
    }

    /// Emit configuration for a grid whose buffers hold exactly one `K` key
    /// and one `V` value per emitted pair.
    pub fn for_grid<K, V>(grid: GridDims) -> Result<Self> {
        let too_large = || ShuffleError::grid_too_large(grid);
        let items = grid.num_items().ok_or_else(too_large)?;
        let key_space = items
            .checked_mul(std::mem::size_of::<K>())
            .ok_or_else(too_large)?;
        let value_space = items
            .checked_mul(std::mem::size_of::<V>())
            .ok_or_else(too_large)?;
        Ok(Self {
            key_space,
            value_space,
            grid,
            items,
        })
    }

    /// Size in bytes of the batch's key buffer.
    pub fn key_space(&self) -> usize {
        self.key_space
    }

    /// Size in bytes of the batch's value buffer.
    pub fn value_space(&self) -> usize {
        self.value_space
    }

    pub fn grid(&self) -> GridDims {
        self.grid
    }

    pub fn num_items(&self) -> usize {
        self.items
    }
}
