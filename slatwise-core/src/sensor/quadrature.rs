//! Quadrature decoding
//!
//! Turns A/B pin levels sampled on every edge into whole detents. A detent
//! is four quarter-steps; the sub-counter keeps the partial cycle so that
//! the reported count is always `floor(quarters / 4)`.

/// One whole detent of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Detent {
    Forward,
    Backward,
}

impl Detent {
    /// Signed change in position
    pub fn delta(self) -> i32 {
        match self {
            Detent::Forward => 1,
            Detent::Backward => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quarter {
    Forward,
    Backward,
}

/// Edge-driven quadrature decoder
///
/// Owned by the edge handler of one sensor. Does no I/O and never blocks.
#[derive(Debug, Clone)]
pub struct QuadratureDecoder {
    a: bool,
    b: bool,
    /// Quarter-steps into the current detent, always in 0..4
    sub: u8,
}

impl QuadratureDecoder {
    /// Create a decoder from the pin levels read at startup
    pub const fn new(a: bool, b: bool) -> Self {
        Self { a, b, sub: 0 }
    }

    /// Feed the pin levels read after an edge
    ///
    /// Returns a detent when the quarter count crosses a cycle boundary.
    pub fn update(&mut self, a: bool, b: bool) -> Option<Detent> {
        let quarter = if a != self.a {
            // A changed; if B changed too an edge was missed and only A counts
            match (a, b) {
                (false, true) | (true, false) => Quarter::Forward,
                (false, false) | (true, true) => Quarter::Backward,
            }
        } else if b != self.b {
            match (b, a) {
                (false, true) | (true, false) => Quarter::Backward,
                (false, false) | (true, true) => Quarter::Forward,
            }
        } else {
            return None;
        };

        self.a = a;
        self.b = b;
        self.step(quarter)
    }

    fn step(&mut self, quarter: Quarter) -> Option<Detent> {
        match quarter {
            Quarter::Forward if self.sub == 3 => {
                self.sub = 0;
                Some(Detent::Forward)
            }
            Quarter::Forward => {
                self.sub += 1;
                None
            }
            Quarter::Backward if self.sub == 0 => {
                self.sub = 3;
                Some(Detent::Backward)
            }
            Quarter::Backward => {
                self.sub -= 1;
                None
            }
        }
    }
}
