//! Index buffer generation with border stitching.
//!
//! A patch at stride `p` is split into a regular interior and a ring of four
//! border strips, each one cell (`p`) deep:
//!
//! ```text
//!   (0,0) ●───────●───────●───────● (s,0)     outer row: stitch stride q
//!         │╲  TOP strip          ╱│
//!         │  ●───●───●───●───●  │           inner row: native stride p
//!         │L │   │   │   │   │ R│
//!         │E ●───●───●───●───● I│
//!         │F │   interior    │ G│
//!         │T ●───●───●───●───● H│
//!         │  │   │   │   │   │ T│
//!         │  ●───●───●───●───●  │
//!         │╱  BOTTOM strip       ╲│
//!   (0,s) ●───────●───────●───────● (s,s)
//! ```
//!
//! Each strip is a trapezoid between its outer edge (sampled at the stride of
//! the coarser of the patch and its neighbor) and its inner row (sampled at
//! the patch's own stride). The two chains are zipped into triangles, so the
//! outer edge uses exactly the vertices the coarser neighbor renders on that
//! edge: no T-junctions, no unreferenced vertex left between them. Strips
//! meet along the corner diagonals `(0,0)-(p,p)` etc., which both adjacent
//! strips share as a triangle edge.

use crate::constants::{grid_index, lod_stride};

/// Grid position (x, z).
type GridPos = (usize, usize);

/// Strides of the four outer edges, in [left, top, right, bottom] order.
pub(crate) type EdgeStrides = [usize; 4];

/// Build a triangle list for a `size` grid at `stride` with per-edge strides.
///
/// Every edge stride must be a multiple of `stride` dividing `size - 1`, and
/// `(size - 1) / stride >= 2`.
pub(crate) fn build_strided(size: usize, stride: usize, edges: EdgeStrides) -> Vec<u32> {
  let s = size - 1;
  let p = stride;
  debug_assert!(s / p >= 2, "stride {} too coarse for size {}", p, size);

  let cells = s / p;
  let mut indices = Vec::with_capacity(cells * cells * 6);

  // Interior: regular cells, diagonal from (x,z) to (x+p,z+p)
  let mut z = p;
  while z + p <= s - p {
    let mut x = p;
    while x + p <= s - p {
      let a = (x, z);
      let b = (x + p, z);
      let c = (x, z + p);
      let d = (x + p, z + p);
      push_tri(&mut indices, size, a, b, d);
      push_tri(&mut indices, size, a, d, c);
      x += p;
    }
    z += p;
  }

  let [left, top, right, bottom] = edges;

  // Top: outer z = 0, inner z = p
  zip_strip(&mut indices, size, s, p, top, |t| (t, 0), |t| (t, p));
  // Bottom: outer z = s, inner z = s - p
  zip_strip(&mut indices, size, s, p, bottom, |t| (t, s), |t| (t, s - p));
  // Left: outer x = 0, inner x = p
  zip_strip(&mut indices, size, s, p, left, |t| (0, t), |t| (p, t));
  // Right: outer x = s, inner x = s - p
  zip_strip(&mut indices, size, s, p, right, |t| (s, t), |t| (s - p, t));

  indices
}

/// Triangulate one border strip by zipping its outer and inner chains.
///
/// `t` runs along the edge; the outer chain covers `0..=s` at `outer_stride`,
/// the inner chain covers `p..=s-p` at `p`.
fn zip_strip(
  indices: &mut Vec<u32>,
  size: usize,
  s: usize,
  p: usize,
  outer_stride: usize,
  outer_at: impl Fn(usize) -> GridPos,
  inner_at: impl Fn(usize) -> GridPos,
) {
  let outer: Vec<usize> = (0..=s).step_by(outer_stride).collect();
  let inner: Vec<usize> = (p..=s - p).step_by(p).collect();
  debug_assert_eq!(outer.last().copied(), Some(s));

  let mut o = 0;
  let mut i = 0;
  while o + 1 < outer.len() || i + 1 < inner.len() {
    let advance_outer = if o + 1 >= outer.len() {
      false
    } else if i + 1 >= inner.len() {
      true
    } else {
      outer[o + 1] <= inner[i + 1]
    };

    if advance_outer {
      push_tri(indices, size, outer_at(outer[o]), outer_at(outer[o + 1]), inner_at(inner[i]));
      o += 1;
    } else {
      push_tri(indices, size, outer_at(outer[o]), inner_at(inner[i + 1]), inner_at(inner[i]));
      i += 1;
    }
  }
}

/// Push a triangle wound counter-clockwise when seen from +Y.
#[inline]
fn push_tri(indices: &mut Vec<u32>, size: usize, a: GridPos, b: GridPos, c: GridPos) {
  let (d1x, d1z) = (b.0 as i64 - a.0 as i64, b.1 as i64 - a.1 as i64);
  let (d2x, d2z) = (c.0 as i64 - a.0 as i64, c.1 as i64 - a.1 as i64);
  // y component of (b - a) x (c - a) with y = 0 in both edges
  let up = d1z * d2x - d1x * d2z;
  let (b, c) = if up >= 0 { (b, c) } else { (c, b) };
  indices.push(grid_index(a.0, a.1, size) as u32);
  indices.push(grid_index(b.0, b.1, size) as u32);
  indices.push(grid_index(c.0, c.1, size) as u32);
}

/// Edge strides for a patch at `lod` against the LODs it stitches to.
///
/// `stitch` holds, per side in [left, top, right, bottom] order, the LOD the
/// outer edge must be sampled at (never finer than `lod`).
pub(crate) fn edge_strides(lod: u32, stitch: [u32; 4]) -> EdgeStrides {
  stitch.map(|n| lod_stride(n.max(lod)))
}
