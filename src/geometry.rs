//! Geometry arithmetic for keyboard moves, resizes, maximize and pointer
//! drags.
//!
//! Everything here is a pure function of a [`Geometry`] and the screen
//! [`Bounds`]; applying the result is the caller's job.

use crate::command::{Direction, Geometry};
use crate::registry::{Client, WindowState};

/// Screen size plus the knobs that constrain window placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub screen_width: i32,
    pub screen_height: i32,
    /// Pixels per keyboard move / resize.
    pub step: i32,
    /// Height of the band at the top of the screen kept free for a bar.
    pub top_band: i32,
    /// Space left free right and below a maximized window (room for its
    /// border).
    pub margin: i32,
}

impl Bounds {
    /// The rectangle a maximized window occupies.
    pub fn maximized(&self) -> Geometry {
        Geometry {
            x: 0,
            y: self.top_band,
            width: (self.screen_width - self.margin).max(1),
            height: (self.screen_height - self.top_band - self.margin).max(1),
        }
    }
}

/// Move `g` one step towards `dir` without leaving the screen.
///
/// Left and up stop at `x = 1` and `y = top_band`; right and down stop when
/// the far edge touches the screen edge.
pub fn move_by(g: Geometry, dir: Direction, b: &Bounds) -> Geometry {
    match dir {
        Direction::Left => Geometry {
            x: 1.max(g.x - b.step),
            ..g
        },
        Direction::Right => Geometry {
            x: (b.screen_width - g.width).min(g.x + b.step),
            ..g
        },
        Direction::Up => Geometry {
            y: b.top_band.max(g.y - b.step),
            ..g
        },
        Direction::Down => Geometry {
            y: (b.screen_height - g.height).min(g.y + b.step),
            ..g
        },
    }
}

/// Shrink (left / up) or grow (right / down) `g` by one step.
///
/// Sizes never drop below 1 and never grow past the screen edge measured
/// from the current origin.
pub fn resize_by(g: Geometry, dir: Direction, b: &Bounds) -> Geometry {
    match dir {
        Direction::Left => Geometry {
            width: (g.width - b.step).max(1),
            ..g
        },
        Direction::Right => Geometry {
            width: (b.screen_width - g.x).min(g.width + b.step).max(1),
            ..g
        },
        Direction::Up => Geometry {
            height: (g.height - b.step).max(1),
            ..g
        },
        Direction::Down => Geometry {
            height: (b.screen_height - g.y).min(g.height + b.step).max(1),
            ..g
        },
    }
}

/// Flip `client` between normal and maximized, returning the geometry to
/// apply.
///
/// Entering the maximized state remembers the current geometry in
/// `saved_geometry`; leaving it restores exactly that geometry.
pub fn toggle_maximize(client: &mut Client, b: &Bounds) -> Geometry {
    match client.state {
        WindowState::Normal => {
            client.saved_geometry = client.geometry;
            client.geometry = b.maximized();
            client.state = WindowState::Maximized;
        }
        WindowState::Maximized => {
            client.geometry = client.saved_geometry;
            client.state = WindowState::Normal;
        }
    }
    client.geometry
}

/// What a pointer drag does to its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Resize,
}

impl DragKind {
    /// Button 1 moves, button 3 resizes, anything else does nothing.
    pub fn from_button(button: u8) -> Option<Self> {
        match button {
            1 => Some(DragKind::Move),
            3 => Some(DragKind::Resize),
            _ => None,
        }
    }
}

/// Geometry of a dragged window after the pointer travelled `(dx, dy)` from
/// where the drag started.
pub fn drag(start: Geometry, kind: DragKind, dx: i32, dy: i32) -> Geometry {
    match kind {
        DragKind::Move => Geometry {
            x: start.x + dx,
            y: start.y + dy,
            ..start
        },
        DragKind::Resize => Geometry {
            width: (start.width + dx).max(1),
            height: (start.height + dy).max(1),
            ..start
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::WindowHandle;

    fn bounds() -> Bounds {
        Bounds {
            screen_width: 1920,
            screen_height: 1080,
            step: 15,
            top_band: 15,
            margin: 2,
        }
    }

    #[test]
    fn move_left_stops_at_one() {
        let b = bounds();
        let mut g = Geometry::new(0, 100, 200, 100);
        for _ in 0..10 {
            g = move_by(g, Direction::Left, &b);
            assert!(g.x >= 1);
        }
        assert_eq!(g.x, 1);
    }

    #[test]
    fn move_right_never_leaves_screen() {
        let b = bounds();
        let mut g = Geometry::new(1700, 100, 200, 100);
        for _ in 0..10 {
            g = move_by(g, Direction::Right, &b);
            assert!(g.x + g.width <= b.screen_width);
        }
        assert_eq!(g.x, 1720);
    }

    #[test]
    fn move_up_stops_at_top_band() {
        let b = bounds();
        let g = move_by(Geometry::new(50, 20, 200, 100), Direction::Up, &b);
        assert_eq!(g.y, 15);
        let g = move_by(g, Direction::Up, &b);
        assert_eq!(g.y, 15);
    }

    #[test]
    fn move_down_stops_at_bottom() {
        let b = bounds();
        let g = move_by(Geometry::new(50, 970, 200, 100), Direction::Down, &b);
        assert_eq!(g.y, 980);
        assert_eq!(g.y + g.height, b.screen_height);
    }

    #[test]
    fn move_keeps_size() {
        let b = bounds();
        let g = move_by(Geometry::new(100, 100, 300, 200), Direction::Right, &b);
        assert_eq!(g, Geometry::new(115, 100, 300, 200));
    }

    #[test]
    fn resize_shrinks_down_to_one() {
        let b = bounds();
        let g = resize_by(Geometry::new(10, 10, 20, 10), Direction::Left, &b);
        assert_eq!(g.width, 5);
        let g = resize_by(g, Direction::Left, &b);
        assert_eq!(g.width, 1);
        let g = resize_by(g, Direction::Up, &b);
        assert_eq!(g.height, 1);
    }

    #[test]
    fn resize_grows_up_to_screen_edge() {
        let b = bounds();
        let g = resize_by(Geometry::new(1800, 1000, 110, 70), Direction::Right, &b);
        assert_eq!(g.width, 120);
        let g = resize_by(g, Direction::Right, &b);
        assert_eq!(g.width, 120);
        let g = resize_by(g, Direction::Down, &b);
        assert_eq!(g.height, 80);
        let g = resize_by(g, Direction::Down, &b);
        assert_eq!(g.height, 80);
    }

    #[test]
    fn resize_keeps_origin() {
        let b = bounds();
        let g = resize_by(Geometry::new(40, 50, 300, 200), Direction::Down, &b);
        assert_eq!(g, Geometry::new(40, 50, 300, 215));
    }

    #[test]
    fn maximized_rectangle() {
        assert_eq!(bounds().maximized(), Geometry::new(0, 15, 1918, 1063));
    }

    #[test]
    fn maximize_and_restore() {
        let b = bounds();
        let mut c = Client::new(WindowHandle(1));
        c.geometry = Geometry::new(10, 10, 200, 100);

        let g = toggle_maximize(&mut c, &b);
        assert_eq!(g, b.maximized());
        assert_eq!(c.state, WindowState::Maximized);

        let g = toggle_maximize(&mut c, &b);
        assert_eq!(g, Geometry::new(10, 10, 200, 100));
        assert_eq!(c.state, WindowState::Normal);
    }

    #[test]
    fn maximize_round_trip_for_many_geometries() {
        let b = bounds();
        for (x, y, w, h) in [(0, 0, 1, 1), (1, 15, 1918, 1063), (-40, 900, 3000, 20), (700, 300, 5, 800)] {
            let mut c = Client::new(WindowHandle(1));
            let start = Geometry::new(x, y, w, h);
            c.geometry = start;
            toggle_maximize(&mut c, &b);
            assert_eq!(toggle_maximize(&mut c, &b), start);
        }
    }

    #[test]
    fn maximize_of_already_maximal_geometry_still_restores() {
        // A window that happens to sit on the maximized rectangle is still
        // in the normal state; toggling twice must give it back unchanged.
        let b = bounds();
        let mut c = Client::new(WindowHandle(1));
        c.geometry = b.maximized();
        toggle_maximize(&mut c, &b);
        assert_eq!(c.state, WindowState::Maximized);
        assert_eq!(toggle_maximize(&mut c, &b), b.maximized());
        assert_eq!(c.state, WindowState::Normal);
    }

    #[test]
    fn drag_buttons() {
        assert_eq!(DragKind::from_button(1), Some(DragKind::Move));
        assert_eq!(DragKind::from_button(3), Some(DragKind::Resize));
        assert_eq!(DragKind::from_button(2), None);
    }

    #[test]
    fn drag_move_and_resize() {
        let start = Geometry::new(100, 100, 300, 200);
        assert_eq!(
            drag(start, DragKind::Move, 25, -30),
            Geometry::new(125, 70, 300, 200)
        );
        assert_eq!(
            drag(start, DragKind::Resize, -500, 40),
            Geometry::new(100, 100, 1, 240)
        );
    }
}
