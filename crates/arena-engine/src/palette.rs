//! Round-robin color palette for snakes that do not pick their own.
//!
//! Palette position is a field on the instance, not process-global state;
//! each controller owns one behind a mutex.

/// The fixed color rotation.
const COLORS: [&str; 8] = [
    "#2196f3", // blue
    "#f44336", // red
    "#4caf50", // green
    "#ff9800", // orange
    "#9c27b0", // purple
    "#00bcd4", // cyan
    "#ffeb3b", // yellow
    "#795548", // brown
];

/// A round-robin dispenser over the fixed palette.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    next: usize,
}

impl Palette {
    /// Start at the first palette color.
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// The next color in rotation.
    pub fn next_color(&mut self) -> String {
        let color = COLORS.get(self.next).copied().unwrap_or("#2196f3");
        self.next = self.next.wrapping_add(1) % COLORS.len();
        color.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_all_colors() {
        let mut palette = Palette::new();
        let first = palette.next_color();
        for _ in 1..COLORS.len() {
            assert_ne!(palette.next_color(), first);
        }
        // Wraps back around.
        assert_eq!(palette.next_color(), first);
    }
}
