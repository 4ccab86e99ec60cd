use image::GrayImage;

/// Rectangle in texel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    /// Sentinel used as "no placement yet"; every real placement sorts before it.
    pub const NONE: Rect = Rect {
        x: u32::MAX,
        y: u32::MAX,
        w: u32::MAX,
        h: u32::MAX,
    };

    pub fn new(w: u32, h: u32) -> Self {
        Self { x: 0, y: 0, w, h }
    }

    /// Placement priority inside an atlas `width` texels wide: lower is better.
    pub fn priority(&self, width: u32) -> u64 {
        (self.y as u64)
            .saturating_mul(width as u64)
            .saturating_add(self.x as u64)
    }
}

/// Fixed-size occupancy bitmap used both as the shared atlas and as the
/// per-chart scratch footprint.
///
/// Rows are padded to whole 64-bit words. Bits outside `[0, width)` are
/// always zero.
#[derive(Debug, Clone)]
pub struct Allocator2D {
    width: u32,
    height: u32,
    words_per_row: usize,
    bits: Vec<u64>,
}

impl Allocator2D {
    pub fn new(width: u32, height: u32) -> Self {
        let words_per_row = (width as usize).div_ceil(64);
        Self {
            width,
            height,
            words_per_row,
            bits: vec![0; words_per_row * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    pub fn set_bit(&mut self, x: u32, y: u32) {
        debug_assert!(x < self.width && y < self.height);
        let idx = self.row_start(y) + (x / 64) as usize;
        self.bits[idx] |= 1u64 << (x % 64);
    }

    pub fn get_bit(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = self.row_start(y) + (x / 64) as usize;
        self.bits[idx] & (1u64 << (x % 64)) != 0
    }

    /// Number of occupied texels.
    pub fn count_set(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Find the lowest-priority position where the `rect.w x rect.h` footprint
    /// in `source` fits without overlapping, writing it into `rect.x`/`rect.y`.
    #[cfg(test)]
    pub fn find(&self, rect: &mut Rect, source: &Allocator2D) -> bool {
        self.find_before(rect, source, &Rect::NONE)
    }

    /// Find the lowest-priority position for the `rect.w x rect.h` footprint
    /// in `source`, giving up as soon as no remaining position could beat
    /// `bound`'s priority. `Rect::NONE` leaves the search unbounded.
    ///
    /// Each source row is reduced to the span between its first and last set
    /// bit, and spans are compared a word at a time.
    pub fn find_before(&self, rect: &mut Rect, source: &Allocator2D, bound: &Rect) -> bool {
        if rect.w > self.width || rect.h > self.height {
            return false;
        }

        let spans = source.row_spans(rect);
        let limit = bound.priority(self.width);

        for y in 0..=(self.height - rect.h) {
            for x in 0..=(self.width - rect.w) {
                if x as u64 + y as u64 * self.width as u64 >= limit {
                    return false;
                }
                if !self.overlaps_spans(x, y, source, &spans) {
                    rect.x = x;
                    rect.y = y;
                    return true;
                }
            }
        }

        false
    }

    /// Reference search testing every footprint texel individually.
    pub fn find_bit_by_bit(&self, rect: &mut Rect, source: &Allocator2D) -> bool {
        if rect.w > self.width || rect.h > self.height {
            return false;
        }

        for y in 0..=(self.height - rect.h) {
            for x in 0..=(self.width - rect.w) {
                if !self.overlaps_bit_by_bit(x, y, rect, source) {
                    rect.x = x;
                    rect.y = y;
                    return true;
                }
            }
        }

        false
    }

    /// Mark the footprint in `source` (at its origin) as occupied at `rect.x`/`rect.y`.
    pub fn alloc(&mut self, rect: &Rect, source: &Allocator2D) {
        for row in 0..rect.h {
            let src_start = source.row_start(row);
            let src_row = &source.bits[src_start..src_start + source.words_per_row];
            let dst_start = self.row_start(rect.y + row);

            let mut start = 0;
            while start < rect.w {
                let len = (rect.w - start).min(64);
                let chunk = extract_bits(src_row, start, len);
                if chunk != 0 {
                    let dst_row = &mut self.bits[dst_start..dst_start + self.words_per_row];
                    deposit_bits(dst_row, rect.x + start, chunk);
                }
                start += len;
            }
        }
    }

    /// Mirror the `[0, rect.w) x [0, rect.h)` region horizontally.
    pub fn flip_x(&mut self, rect: &Rect) {
        for y in 0..rect.h {
            for x in 0..rect.w / 2 {
                let mirror = rect.w - 1 - x;
                let a = self.get_bit(x, y);
                let b = self.get_bit(mirror, y);
                if a != b {
                    self.toggle_bit(x, y);
                    self.toggle_bit(mirror, y);
                }
            }
        }
    }

    /// Mirror the `[0, rect.w) x [0, rect.h)` region vertically.
    pub fn flip_y(&mut self, rect: &Rect) {
        let wpr = self.words_per_row;
        for y in 0..rect.h / 2 {
            let top = self.row_start(y);
            let bottom = self.row_start(rect.h - 1 - y);
            for w in 0..wpr {
                self.bits.swap(top + w, bottom + w);
            }
        }
    }

    /// Render the bitmap as an 8-bit mask (occupied = 255), row 0 at the top.
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get_bit(x, y) {
                image::Luma([255])
            } else {
                image::Luma([0])
            }
        })
    }

    fn row_start(&self, y: u32) -> usize {
        y as usize * self.words_per_row
    }

    fn toggle_bit(&mut self, x: u32, y: u32) {
        let idx = self.row_start(y) + (x / 64) as usize;
        self.bits[idx] ^= 1u64 << (x % 64);
    }

    /// Inclusive `(first, last)` set-bit span of each footprint row, `None` for empty rows.
    fn row_spans(&self, rect: &Rect) -> Vec<Option<(u32, u32)>> {
        (0..rect.h)
            .map(|y| {
                let start = self.row_start(y);
                let row = &self.bits[start..start + self.words_per_row];
                let mut first = None;
                let mut last = None;
                for (i, &word) in row.iter().enumerate() {
                    if word == 0 {
                        continue;
                    }
                    let base = i as u32 * 64;
                    if first.is_none() {
                        first = Some(base + word.trailing_zeros());
                    }
                    last = Some(base + 63 - word.leading_zeros());
                }
                first.zip(last).map(|(f, l)| (f, l.min(rect.w.saturating_sub(1))))
            })
            .collect()
    }

    fn overlaps_spans(
        &self,
        x: u32,
        y: u32,
        source: &Allocator2D,
        spans: &[Option<(u32, u32)>],
    ) -> bool {
        for (row, span) in spans.iter().enumerate() {
            let Some((first, last)) = *span else {
                continue;
            };
            let row = row as u32;
            let src_start = source.row_start(row);
            let src_row = &source.bits[src_start..src_start + source.words_per_row];
            let dst_start = self.row_start(y + row);
            let dst_row = &self.bits[dst_start..dst_start + self.words_per_row];

            let mut start = first;
            while start <= last {
                let len = (last + 1 - start).min(64);
                let src = extract_bits(src_row, start, len);
                let dst = extract_bits(dst_row, x + start, len);
                if src & dst != 0 {
                    return true;
                }
                start += len;
            }
        }
        false
    }

    fn overlaps_bit_by_bit(&self, x: u32, y: u32, rect: &Rect, source: &Allocator2D) -> bool {
        for sy in 0..rect.h {
            for sx in 0..rect.w {
                if source.get_bit(sx, sy) && self.get_bit(x + sx, y + sy) {
                    return true;
                }
            }
        }
        false
    }
}

/// Read `len` (1..=64) bits of `row` starting at bit `offset`, out-of-range bits as zero.
fn extract_bits(row: &[u64], offset: u32, len: u32) -> u64 {
    let word = (offset / 64) as usize;
    let shift = offset % 64;

    let mut bits = row.get(word).copied().unwrap_or(0) >> shift;
    if shift > 0 {
        bits |= row.get(word + 1).copied().unwrap_or(0) << (64 - shift);
    }

    if len < 64 { bits & ((1u64 << len) - 1) } else { bits }
}

/// OR `bits` into `row` starting at bit `offset`.
fn deposit_bits(row: &mut [u64], offset: u32, bits: u64) {
    let word = (offset / 64) as usize;
    let shift = offset % 64;

    row[word] |= bits << shift;
    if shift > 0 {
        let spill = bits >> (64 - shift);
        if spill != 0 {
            row[word + 1] |= spill;
        }
    }
}
