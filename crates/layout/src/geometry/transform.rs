//! Vector instruction replay.
//!
//! The decoder hands us PDF path construction operators in user space.
//! [`TransformTracker`] keeps the current transformation matrix (with a
//! save/restore stack) and resolves every drawn edge into an absolute
//! [`Segment`] in top-origin page coordinates, the same space the glyph
//! records live in.

use log::{debug, warn};

use crate::config::LayoutConfig;
use crate::types::{Segment, VectorOp};

/// Affine matrix `[a, b, c, d, e, f]` mapping `(x, y)` to
/// `(a*x + c*y + e, b*x + d*y + f)`.
pub type Matrix = [f32; 6];

pub const IDENTITY_MATRIX: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Compose two matrices so that the result applies `inner` first and then
/// `outer`.
pub fn multiply(outer: &Matrix, inner: &Matrix) -> Matrix {
    let [a1, b1, c1, d1, e1, f1] = *outer;
    let [a2, b2, c2, d2, e2, f2] = *inner;
    [
        a1 * a2 + c1 * b2,
        b1 * a2 + d1 * b2,
        a1 * c2 + c1 * d2,
        b1 * c2 + d1 * d2,
        a1 * e2 + c1 * f2 + e1,
        b1 * e2 + d1 * f2 + f1,
    ]
}

pub fn apply(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Stateful replay of one page's vector instructions.
#[derive(Debug, Clone)]
pub struct TransformTracker {
    page_height: f32,
    close_path_min: f32,
    ctm: Matrix,
    stack: Vec<Matrix>,
    /// Current point, untransformed.
    current: (f32, f32),
    /// Start of the current subpath, untransformed.
    subpath_start: (f32, f32),
    segments: Vec<Segment>,
}

impl TransformTracker {
    pub fn new(page_height: f32, close_path_min: f32) -> Self {
        Self {
            page_height,
            close_path_min,
            ctm: IDENTITY_MATRIX,
            stack: Vec::new(),
            current: (0.0, 0.0),
            subpath_start: (0.0, 0.0),
            segments: Vec::new(),
        }
    }

    pub fn ctm(&self) -> Matrix {
        self.ctm
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    pub fn apply(&mut self, op: &VectorOp) {
        match *op {
            VectorOp::Save => self.stack.push(self.ctm),
            VectorOp::Restore => match self.stack.pop() {
                Some(m) => self.ctm = m,
                None => warn!("restore without matching save; keeping current transform"),
            },
            VectorOp::Transform(m) => self.ctm = multiply(&self.ctm, &m),
            VectorOp::MoveTo(x, y) => {
                self.current = (x, y);
                self.subpath_start = (x, y);
            }
            VectorOp::LineTo(x, y) => {
                let seg = self.resolve(self.current, (x, y));
                self.segments.push(seg);
                self.current = (x, y);
            }
            VectorOp::Rectangle(x, y, w, h) => {
                let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
                for i in 0..4 {
                    let seg = self.resolve(corners[i], corners[(i + 1) % 4]);
                    self.segments.push(seg);
                }
                self.current = (x, y);
                self.subpath_start = (x, y);
            }
            VectorOp::ClosePath => {
                let seg = self.resolve(self.current, self.subpath_start);
                if seg.length() > self.close_path_min {
                    self.segments.push(seg);
                }
                self.current = self.subpath_start;
            }
            VectorOp::Other(ref name) => debug!("skipping vector instruction {name}"),
        }
    }

    /// Transform both endpoints and flip them into top-origin space.
    fn resolve(&self, from: (f32, f32), to: (f32, f32)) -> Segment {
        let (x0, y0) = apply(&self.ctm, from.0, from.1);
        let (x1, y1) = apply(&self.ctm, to.0, to.1);
        Segment::new(x0, self.page_height - y0, x1, self.page_height - y1)
    }
}

/// Replay `ops` from a clean state and return every emitted segment.
pub fn extract_segments(ops: &[VectorOp], page_height: f32, config: &LayoutConfig) -> Vec<Segment> {
    let mut tracker = TransformTracker::new(page_height, config.close_path_min);
    for op in ops {
        tracker.apply(op);
    }
    if tracker.depth() > 0 {
        debug!("{} unbalanced save(s) at end of page", tracker.depth());
    }
    tracker.into_segments()
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: f32 = 800.0;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn matrix_approx(a: &Matrix, b: &Matrix) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| approx(*x, *y))
    }

    fn run(ops: &[VectorOp]) -> Vec<Segment> {
        extract_segments(ops, H, &LayoutConfig::default())
    }

    #[test]
    fn multiply_with_identity_is_noop() {
        let m = [2.0, 0.5, -1.0, 3.0, 10.0, 20.0];
        assert_eq!(multiply(&IDENTITY_MATRIX, &m), m);
        assert_eq!(multiply(&m, &IDENTITY_MATRIX), m);
    }

    #[test]
    fn transform_composes_in_instruction_order() {
        let scale = [2.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        let translate = [1.0, 0.0, 0.0, 1.0, 10.0, 5.0];
        let rotate = [0.0, 1.0, -1.0, 0.0, 0.0, 0.0];

        let mut tracker = TransformTracker::new(H, 0.5);
        tracker.apply(&VectorOp::Transform(scale));
        tracker.apply(&VectorOp::Transform(translate));
        tracker.apply(&VectorOp::Transform(rotate));

        let expected = multiply(&multiply(&scale, &translate), &rotate);
        assert!(matrix_approx(&tracker.ctm(), &expected));

        // A point goes through the last matrix first.
        let (x, y) = apply(&tracker.ctm(), 1.0, 0.0);
        // rotate: (0, 1) -> translate: (10, 6) -> scale: (20, 12)
        assert!(approx(x, 20.0) && approx(y, 12.0));
    }

    #[test]
    fn restore_returns_exact_snapshot_with_nesting() {
        let a = [1.0, 0.0, 0.0, 1.0, 5.0, 5.0];
        let b = [3.0, 0.0, 0.0, 3.0, 0.0, 0.0];

        let mut tracker = TransformTracker::new(H, 0.5);
        tracker.apply(&VectorOp::Transform(a));
        let outer = tracker.ctm();

        tracker.apply(&VectorOp::Save);
        tracker.apply(&VectorOp::Transform(b));
        let middle = tracker.ctm();

        tracker.apply(&VectorOp::Save);
        tracker.apply(&VectorOp::Transform(b));
        assert_ne!(tracker.ctm(), middle);

        tracker.apply(&VectorOp::Restore);
        assert_eq!(tracker.ctm(), middle);
        tracker.apply(&VectorOp::Restore);
        assert_eq!(tracker.ctm(), outer);
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn unbalanced_restore_keeps_transform() {
        let m = [1.0, 0.0, 0.0, 1.0, 7.0, 0.0];
        let mut tracker = TransformTracker::new(H, 0.5);
        tracker.apply(&VectorOp::Transform(m));
        tracker.apply(&VectorOp::Restore);
        assert_eq!(tracker.ctm(), m);
    }

    #[test]
    fn rectangle_decomposes_into_closed_loop() {
        let segs = run(&[VectorOp::Rectangle(10.0, 20.0, 100.0, 50.0)]);
        assert_eq!(segs.len(), 4);

        // bottom, right, top, left
        assert_eq!(segs[0], Segment::new(10.0, H - 20.0, 110.0, H - 20.0));
        assert_eq!(segs[1], Segment::new(110.0, H - 20.0, 110.0, H - 70.0));
        assert_eq!(segs[2], Segment::new(110.0, H - 70.0, 10.0, H - 70.0));
        assert_eq!(segs[3], Segment::new(10.0, H - 70.0, 10.0, H - 20.0));

        for i in 0..4 {
            let next = segs[(i + 1) % 4];
            assert_eq!((segs[i].x1, segs[i].y1), (next.x0, next.y0));
        }
    }

    #[test]
    fn line_to_flips_vertical_axis() {
        let segs = run(&[VectorOp::MoveTo(0.0, 100.0), VectorOp::LineTo(50.0, 100.0)]);
        assert_eq!(segs, vec![Segment::new(0.0, 700.0, 50.0, 700.0)]);
    }

    #[test]
    fn line_to_uses_current_transform() {
        let segs = run(&[
            VectorOp::Save,
            VectorOp::Transform([1.0, 0.0, 0.0, 1.0, 100.0, 0.0]),
            VectorOp::MoveTo(0.0, 0.0),
            VectorOp::LineTo(10.0, 0.0),
            VectorOp::Restore,
            VectorOp::MoveTo(0.0, 0.0),
            VectorOp::LineTo(10.0, 0.0),
        ]);
        assert_eq!(segs[0], Segment::new(100.0, H, 110.0, H));
        assert_eq!(segs[1], Segment::new(0.0, H, 10.0, H));
    }

    #[test]
    fn close_path_emits_closing_edge() {
        let segs = run(&[
            VectorOp::MoveTo(0.0, 0.0),
            VectorOp::LineTo(10.0, 0.0),
            VectorOp::LineTo(10.0, 10.0),
            VectorOp::ClosePath,
            VectorOp::LineTo(0.0, 5.0),
        ]);
        assert_eq!(segs.len(), 4);
        assert_eq!(segs[2], Segment::new(10.0, H - 10.0, 0.0, H));
        // Current point went back to the subpath start.
        assert_eq!(segs[3], Segment::new(0.0, H, 0.0, H - 5.0));
    }

    #[test]
    fn close_path_skips_degenerate_edge() {
        let segs = run(&[
            VectorOp::MoveTo(0.0, 0.0),
            VectorOp::LineTo(10.0, 0.0),
            VectorOp::LineTo(0.2, 0.2),
            VectorOp::ClosePath,
        ]);
        assert_eq!(segs.len(), 2);
    }

    #[test]
    fn unknown_instructions_are_skipped() {
        let segs = run(&[
            VectorOp::Other("curveTo".to_string()),
            VectorOp::MoveTo(0.0, 0.0),
            VectorOp::Other("stroke".to_string()),
            VectorOp::LineTo(0.0, 10.0),
        ]);
        assert_eq!(segs.len(), 1);
    }
}
