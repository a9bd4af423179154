//! Linear-space Myers diff over token slices.
//!
//! Common prefix and suffix are stripped first, then the remaining range is
//! split at the middle snake and both halves are diffed recursively.

use std::ops::{Index, IndexMut, Range};

/// One step of an edit script, expressed as index ranges into the inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    Equal {
        old_index: usize,
        new_index: usize,
        len: usize,
    },
    Delete {
        old_index: usize,
        len: usize,
    },
    Insert {
        new_index: usize,
        len: usize,
    },
}

/// Computes an edit script turning `old` into `new`.
///
/// Ops are emitted in order: replaying them reproduces `new` from `old`.
pub fn diff_tokens<T: PartialEq>(old: &[T], new: &[T]) -> Vec<DiffOp> {
    let max_d = (old.len() + new.len() + 1) / 2 + 1;
    let mut vf = V::new(max_d);
    let mut vb = V::new(max_d);
    let mut ops = Vec::new();
    conquer(
        old,
        0..old.len(),
        new,
        0..new.len(),
        &mut vf,
        &mut vb,
        &mut ops,
    );
    ops
}

/// Furthest-reaching x per diagonal, indexed by a signed diagonal number.
struct V {
    offset: isize,
    v: Vec<isize>,
}

impl V {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize + 1,
            v: vec![0; 2 * max_d + 3],
        }
    }
}

impl Index<isize> for V {
    type Output = isize;

    fn index(&self, k: isize) -> &isize {
        &self.v[(k + self.offset) as usize]
    }
}

impl IndexMut<isize> for V {
    fn index_mut(&mut self, k: isize) -> &mut isize {
        &mut self.v[(k + self.offset) as usize]
    }
}

fn common_prefix_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Returns a split point (absolute indices) lying on an optimal edit path.
///
/// Backward search runs in reversed coordinates: `vb[k]` counts tokens
/// consumed from the end of the old range.
fn find_middle_snake<T: PartialEq>(
    old: &[T],
    old_range: &Range<usize>,
    new: &[T],
    new_range: &Range<usize>,
    vf: &mut V,
    vb: &mut V,
) -> Option<(usize, usize)> {
    let n = old_range.len() as isize;
    let m = new_range.len() as isize;
    let delta = n - m;
    let odd = delta & 1 == 1;

    vf[1] = 0;
    vb[1] = 0;

    let d_max = (n + m + 1) / 2 + 1;
    for d in 0..d_max {
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && vf[k - 1] < vf[k + 1]) {
                vf[k + 1]
            } else {
                vf[k - 1] + 1
            };
            let y = x - k;
            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix_len(
                    &old[old_range.start + x as usize..old_range.end],
                    &new[new_range.start + y as usize..new_range.end],
                ) as isize;
            }
            vf[k] = x;
            if odd
                && (k - delta).abs() <= d - 1
                && vf[k] + vb[-(k - delta)] >= n
                && (0..=n).contains(&x0)
                && (0..=m).contains(&y0)
            {
                return Some((
                    old_range.start + x0 as usize,
                    new_range.start + y0 as usize,
                ));
            }
            k += 2;
        }

        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && vb[k - 1] < vb[k + 1]) {
                vb[k + 1]
            } else {
                vb[k - 1] + 1
            };
            let mut y = x - k;
            if x < n && y < m {
                let advance = common_suffix_len(
                    &old[old_range.start..old_range.start + (n - x) as usize],
                    &new[new_range.start..new_range.start + (m - y) as usize],
                ) as isize;
                x += advance;
                y += advance;
            }
            vb[k] = x;
            if !odd
                && (k - delta).abs() <= d
                && vb[k] + vf[-(k - delta)] >= n
                && (0..=n).contains(&x)
                && (0..=m).contains(&y)
            {
                return Some((
                    old_range.start + (n - x) as usize,
                    new_range.start + (m - y) as usize,
                ));
            }
            k += 2;
        }
    }

    None
}

fn conquer<T: PartialEq>(
    old: &[T],
    mut old_range: Range<usize>,
    new: &[T],
    mut new_range: Range<usize>,
    vf: &mut V,
    vb: &mut V,
    ops: &mut Vec<DiffOp>,
) {
    let prefix = common_prefix_len(&old[old_range.clone()], &new[new_range.clone()]);
    if prefix > 0 {
        ops.push(DiffOp::Equal {
            old_index: old_range.start,
            new_index: new_range.start,
            len: prefix,
        });
    }
    old_range.start += prefix;
    new_range.start += prefix;

    let suffix = common_suffix_len(&old[old_range.clone()], &new[new_range.clone()]);
    old_range.end -= suffix;
    new_range.end -= suffix;

    if old_range.is_empty() && new_range.is_empty() {
        // fully matched
    } else if old_range.is_empty() {
        ops.push(DiffOp::Insert {
            new_index: new_range.start,
            len: new_range.len(),
        });
    } else if new_range.is_empty() {
        ops.push(DiffOp::Delete {
            old_index: old_range.start,
            len: old_range.len(),
        });
    } else {
        let split = find_middle_snake(old, &old_range, new, &new_range, vf, vb).filter(|&split| {
            split != (old_range.start, new_range.start) && split != (old_range.end, new_range.end)
        });
        match split {
            Some((x, y)) => {
                conquer(old, old_range.start..x, new, new_range.start..y, vf, vb, ops);
                conquer(old, x..old_range.end, new, y..new_range.end, vf, vb, ops);
            }
            None => {
                ops.push(DiffOp::Delete {
                    old_index: old_range.start,
                    len: old_range.len(),
                });
                ops.push(DiffOp::Insert {
                    new_index: new_range.start,
                    len: new_range.len(),
                });
            }
        }
    }

    if suffix > 0 {
        ops.push(DiffOp::Equal {
            old_index: old_range.end,
            new_index: new_range.end,
            len: suffix,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay<'a>(old: &[&'a str], new: &[&'a str], ops: &[DiffOp]) -> (Vec<&'a str>, Vec<&'a str>) {
        let mut rebuilt_old = Vec::new();
        let mut rebuilt_new = Vec::new();
        for op in ops {
            match *op {
                DiffOp::Equal {
                    old_index,
                    new_index,
                    len,
                } => {
                    assert_eq!(old[old_index..old_index + len], new[new_index..new_index + len]);
                    rebuilt_old.extend_from_slice(&old[old_index..old_index + len]);
                    rebuilt_new.extend_from_slice(&new[new_index..new_index + len]);
                }
                DiffOp::Delete { old_index, len } => {
                    rebuilt_old.extend_from_slice(&old[old_index..old_index + len])
                }
                DiffOp::Insert { new_index, len } => {
                    rebuilt_new.extend_from_slice(&new[new_index..new_index + len])
                }
            }
        }
        (rebuilt_old, rebuilt_new)
    }

    fn edit_count(ops: &[DiffOp]) -> usize {
        ops.iter()
            .map(|op| match *op {
                DiffOp::Equal { .. } => 0,
                DiffOp::Delete { len, .. } | DiffOp::Insert { len, .. } => len,
            })
            .sum()
    }

    #[test]
    fn test_identical_inputs_produce_single_equal() {
        let a = ["x", "y", "z"];
        let ops = diff_tokens(&a, &a);
        assert_eq!(
            ops,
            vec![DiffOp::Equal {
                old_index: 0,
                new_index: 0,
                len: 3
            }]
        );
    }

    #[test]
    fn test_empty_inputs_produce_no_ops() {
        let empty: [&str; 0] = [];
        assert!(diff_tokens(&empty, &empty).is_empty());
    }

    #[test]
    fn test_single_replacement() {
        let old = ["a", "b", "c"];
        let new = ["a", "B", "c"];
        let ops = diff_tokens(&old, &new);
        assert_eq!(edit_count(&ops), 2);
        let (o, n) = replay(&old, &new, &ops);
        assert_eq!(o, old);
        assert_eq!(n, new);
    }

    #[test]
    fn test_edit_script_is_minimal_for_classic_example() {
        // Myers' paper example: ABCABBA -> CBABAC has D = 5.
        let old: Vec<&str> = "A B C A B B A".split(' ').collect();
        let new: Vec<&str> = "C B A B A C".split(' ').collect();
        let ops = diff_tokens(&old, &new);
        assert_eq!(edit_count(&ops), 5);
        let (o, n) = replay(&old, &new, &ops);
        assert_eq!(o, old);
        assert_eq!(n, new);
    }

    #[test]
    fn test_replay_reconstructs_both_sides_for_generated_inputs() {
        let vocab = ["a", "b", "c", "d", "e"];
        let mut seed: u64 = 0x5eed;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };
        for _ in 0..200 {
            let old: Vec<&str> = (0..next() % 12).map(|_| vocab[next() % vocab.len()]).collect();
            let new: Vec<&str> = (0..next() % 12).map(|_| vocab[next() % vocab.len()]).collect();
            let ops = diff_tokens(&old, &new);
            let (o, n) = replay(&old, &new, &ops);
            assert_eq!(o, old, "old side mismatch for {old:?} -> {new:?}");
            assert_eq!(n, new, "new side mismatch for {old:?} -> {new:?}");
        }
    }
}
