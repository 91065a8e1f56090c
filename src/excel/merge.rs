//! Merged-region bookkeeping. Only the anchor (top-left) cell of a merge
//! accepts values and styles, so every write goes through these helpers first.

use umya_spreadsheet::Worksheet;

/// Column index (1-based) to Excel letters (1→A, 26→Z, 27→AA).
pub fn column_letter(col: u32) -> String {
    let mut n = col.max(1) - 1;
    let mut s = String::new();
    loop {
        let r = (n % 26) as u8;
        s.insert(0, (b'A' + r) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    s
}

/// Parse an A1 reference ("$B$12" allowed) into 1-based (col, row).
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let cleaned: String = reference.chars().filter(|c| *c != '$').collect();
    let split = cleaned.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cleaned.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut col = 0u32;
    for c in letters.chars() {
        col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((col, row))
}

/// Rectangle of a merged region, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeArea {
    pub first_col: u32,
    pub first_row: u32,
    pub last_col: u32,
    pub last_row: u32,
}

impl MergeArea {
    /// Parse "A8:C9" (or a single "A8").
    pub fn parse(range: &str) -> Option<MergeArea> {
        let (start, end) = match range.split_once(':') {
            Some((a, b)) => (a, b),
            None => (range, range),
        };
        let (c0, r0) = parse_cell_ref(start.trim())?;
        let (c1, r1) = parse_cell_ref(end.trim())?;
        Some(MergeArea {
            first_col: c0.min(c1),
            first_row: r0.min(r1),
            last_col: c0.max(c1),
            last_row: r0.max(r1),
        })
    }

    pub fn contains(&self, col: u32, row: u32) -> bool {
        col >= self.first_col && col <= self.last_col && row >= self.first_row && row <= self.last_row
    }

    pub fn anchor(&self) -> (u32, u32) {
        (self.first_col, self.first_row)
    }

    pub fn is_anchor(&self, col: u32, row: u32) -> bool {
        self.anchor() == (col, row)
    }

    pub fn touches_row(&self, row: u32) -> bool {
        row >= self.first_row && row <= self.last_row
    }

    pub fn shifted(&self, row_offset: i64) -> MergeArea {
        let shift = |r: u32| (r as i64 + row_offset).max(1) as u32;
        MergeArea {
            first_row: shift(self.first_row),
            last_row: shift(self.last_row),
            ..*self
        }
    }

    pub fn to_range(&self) -> String {
        format!(
            "{}{}:{}{}",
            column_letter(self.first_col),
            self.first_row,
            column_letter(self.last_col),
            self.last_row
        )
    }
}

pub fn merge_areas(sheet: &Worksheet) -> Vec<MergeArea> {
    sheet
        .get_merge_cells()
        .iter()
        .filter_map(|r| MergeArea::parse(&r.get_range()))
        .collect()
}

pub fn area_containing(sheet: &Worksheet, col: u32, row: u32) -> Option<MergeArea> {
    merge_areas(sheet).into_iter().find(|a| a.contains(col, row))
}

/// Where a write aimed at (col, row) must actually land.
pub fn write_target(sheet: &Worksheet, col: u32, row: u32) -> (u32, u32) {
    area_containing(sheet, col, row)
        .map(|a| a.anchor())
        .unwrap_or((col, row))
}

/// True when (col, row) sits inside a merge without being its anchor.
pub fn is_covered(sheet: &Worksheet, col: u32, row: u32) -> bool {
    area_containing(sheet, col, row)
        .map(|a| !a.is_anchor(col, row))
        .unwrap_or(false)
}

/// Drop every merge satisfying `pred`. Returns how many were removed.
pub fn unmerge_where<F>(sheet: &mut Worksheet, pred: F) -> usize
where
    F: Fn(&MergeArea) -> bool,
{
    let merges = sheet.get_merge_cells_mut();
    let before = merges.len();
    merges.retain(|r| match MergeArea::parse(&r.get_range()) {
        Some(area) => !pred(&area),
        None => true,
    });
    before - merges.len()
}

/// Unmerge any region that overlaps `row`.
pub fn clear_row_merges(sheet: &mut Worksheet, row: u32) -> usize {
    unmerge_where(sheet, |a| a.touches_row(row))
}

/// Unmerge the region covering one cell, if any.
pub fn clear_cell_merge(sheet: &mut Worksheet, col: u32, row: u32) -> usize {
    unmerge_where(sheet, |a| a.contains(col, row))
}
