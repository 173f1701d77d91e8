use flaredrive_protocol::PART_SIZE_LIMIT;

// ---------------------------------------------------------------------------
// PartDescriptor
// ---------------------------------------------------------------------------

/// One contiguous byte range `[start, end)` of a multipart upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartDescriptor {
    /// 1-based part number.
    pub part_number: u32,
    pub start: u64,
    pub end: u64,
}

impl PartDescriptor {
    /// Number of bytes covered by this part.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

// ---------------------------------------------------------------------------
// PartPlan
// ---------------------------------------------------------------------------

/// Splits a file of `size` bytes into parts of `part_size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    size: u64,
    part_size: u64,
}

impl PartPlan {
    /// Plans parts of [`PART_SIZE_LIMIT`] bytes.
    pub fn new(size: u64) -> Self {
        Self::with_part_size(size, PART_SIZE_LIMIT)
    }

    /// Plans parts of `part_size` bytes. A `part_size` of 0 falls back to
    /// [`PART_SIZE_LIMIT`].
    pub fn with_part_size(size: u64, part_size: u64) -> Self {
        let part_size = if part_size == 0 {
            PART_SIZE_LIMIT
        } else {
            part_size
        };
        Self { size, part_size }
    }

    /// `ceil(size / part_size)`.
    pub fn part_count(&self) -> u32 {
        self.size.div_ceil(self.part_size) as u32
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Returns the descriptor of part `part_number` (1-based).
    pub fn part(&self, part_number: u32) -> Option<PartDescriptor> {
        if part_number == 0 || part_number > self.part_count() {
            return None;
        }
        let start = u64::from(part_number - 1) * self.part_size;
        let end = (u64::from(part_number) * self.part_size).min(self.size);
        Some(PartDescriptor {
            part_number,
            start,
            end,
        })
    }

    /// Iterates parts in ascending part-number order.
    pub fn parts(&self) -> impl Iterator<Item = PartDescriptor> + '_ {
        (1..=self.part_count()).filter_map(|n| self.part(n))
    }
}
