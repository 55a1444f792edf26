//! # Speckle filtering
//!
//! Removes small connected regions of similar disparity. Regions are found with a union-find over
//! the flat pixel index array: two 4-neighbours belong to the same region when both are valid and
//! their values differ by at most `max_diff`.

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Disjoint sets over pixel indices, union by size with path halving.
struct DisjointSets {
    parent: Vec<u32>,
    size: Vec<u32>,
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut i: u32) -> u32 {
        while self.parent[i as usize] != i {
            let grandparent = self.parent[self.parent[i as usize] as usize];
            self.parent[i as usize] = grandparent;
            i = grandparent;
        }
        i
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra as usize] >= self.size[rb as usize] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small as usize] = big;
        self.size[big as usize] += self.size[small as usize];
    }

    fn region_size(&mut self, i: u32) -> u32 {
        let root = self.find(i);
        self.size[root as usize]
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Invalidate every region of fewer than `min_region` valid pixels.
///
/// `data` is a row-major `width x height` grid whose invalid cells hold `invalid`. Returns the
/// number of pixels that were invalidated.
pub fn filter_speckles(
    data: &mut [i16],
    width: usize,
    height: usize,
    invalid: i16,
    min_region: usize,
    max_diff: i32,
) -> usize {
    debug_assert_eq!(data.len(), width * height);
    if min_region == 0 || data.is_empty() {
        return 0;
    }

    let similar = |a: i16, b: i16| {
        a != invalid && b != invalid && (a as i32 - b as i32).abs() <= max_diff
    };

    let mut sets = DisjointSets::new(data.len());
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            if data[i] == invalid {
                continue;
            }
            if x + 1 < width && similar(data[i], data[i + 1]) {
                sets.union(i as u32, (i + 1) as u32);
            }
            if y + 1 < height && similar(data[i], data[i + width]) {
                sets.union(i as u32, (i + width) as u32);
            }
        }
    }

    let mut removed = 0;
    for i in 0..data.len() {
        if data[i] != invalid && (sets.region_size(i as u32) as usize) < min_region {
            data[i] = invalid;
            removed += 1;
        }
    }

    removed
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const INV: i16 = -16;

    #[test]
    fn small_islands_are_removed() {
        #[rustfmt::skip]
        let mut data = vec![
            80, 80, 80, 80, INV, INV,
            80, 80, 80, 80, INV, 300,
            80, 80, 80, 80, INV, INV,
            INV, INV, INV, INV, 200, 200,
        ];
        let removed = filter_speckles(&mut data, 6, 4, INV, 3, 16);
        assert_eq!(removed, 3);
        assert_eq!(data[11], INV);
        assert_eq!(data[22], INV);
        assert_eq!(data[23], INV);
        assert!(data[..4].iter().all(|&v| v == 80));
    }

    #[test]
    fn range_controls_connectivity() {
        // A ramp with steps of 16: one region with range 16, six singletons with range 15.
        let ramp: Vec<i16> = (0..6).map(|i| i * 16).collect();

        let mut data = ramp.clone();
        assert_eq!(filter_speckles(&mut data, 6, 1, INV, 6, 16), 0);
        assert_eq!(data, ramp);

        let mut data = ramp.clone();
        assert_eq!(filter_speckles(&mut data, 6, 1, INV, 2, 15), 6);
        assert!(data.iter().all(|&v| v == INV));
    }

    #[test]
    fn zero_window_disables_filter() {
        let mut data = vec![5, INV, 7];
        assert_eq!(filter_speckles(&mut data, 3, 1, INV, 0, 0), 0);
        assert_eq!(data, vec![5, INV, 7]);
    }

    #[test]
    fn invalid_cells_never_join_regions() {
        // Two pixels separated by an invalid cell stay separate regions of size 1.
        let mut data = vec![32, INV, 32];
        assert_eq!(filter_speckles(&mut data, 3, 1, INV, 2, 100), 2);
    }
}
