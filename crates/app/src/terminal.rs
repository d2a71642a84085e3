use std::io::Write;

use flipbook_core::{FrameAsset, Result, SpriteSlot};

/// Draws sprite slots at fixed terminal positions, redrawing only the slots
/// that changed since the previous call.
#[derive(Debug)]
pub struct Terminal<W: Write> {
    out: W,
    views: Vec<View>,
}

#[derive(Debug)]
struct View {
    slot: SpriteSlot,
    column: u16,
    row: u16,
    seen: u64,
    drawn: Option<FrameAsset>,
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            views: Vec::new(),
        }
    }

    /// Places `slot` with its top-left corner at the 1-based `(column, row)`.
    pub fn add(&mut self, slot: SpriteSlot, (column, row): (u16, u16)) {
        self.views.push(View {
            slot,
            column: column.max(1),
            row: row.max(1),
            seen: 0,
            drawn: None,
        });
    }

    pub fn clear(&mut self) -> Result<()> {
        write!(self.out, "\x1b[H\x1b[J")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn draw(&mut self) -> Result<()> {
        for view in &mut self.views {
            let Some((version, frame)) = view.slot.changed_since(view.seen) else {
                continue;
            };
            view.seen = version;

            let previous_height = view.drawn.as_ref().map_or(0, |f| f.rows().len());
            for (offset, line) in frame.rows().iter().enumerate() {
                write!(
                    self.out,
                    "\x1b[{};{}H\x1b[0m{line}\x1b[K",
                    usize::from(view.row) + offset,
                    view.column
                )?;
            }
            for offset in frame.rows().len()..previous_height {
                write!(
                    self.out,
                    "\x1b[{};{}H\x1b[K",
                    usize::from(view.row) + offset,
                    view.column
                )?;
            }
            view.drawn = Some(frame);
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use flipbook_core::Sprite;

    use super::*;

    #[test]
    fn draws_changed_slots_at_their_origin() {
        let mut slot = SpriteSlot::new();
        let mut terminal = Terminal::new(Vec::new());
        terminal.add(slot.clone(), (4, 2));

        slot.set_asset(&FrameAsset::new("a", vec!["ab".into(), "cd".into()]))
            .unwrap();
        terminal.draw().unwrap();
        terminal.draw().unwrap();

        let text = String::from_utf8(terminal.into_inner()).unwrap();
        assert_eq!(text.matches("\x1b[2;4H").count(), 1);
        assert!(text.contains("\x1b[3;4H\x1b[0mcd"));
    }

    #[test]
    fn blanks_rows_left_over_from_taller_frames() {
        let mut slot = SpriteSlot::new();
        let mut terminal = Terminal::new(Vec::new());
        terminal.add(slot.clone(), (1, 1));

        slot.set_asset(&FrameAsset::new("tall", vec!["1".into(), "2".into()]))
            .unwrap();
        terminal.draw().unwrap();
        slot.set_asset(&FrameAsset::new("short", vec!["3".into()]))
            .unwrap();
        terminal.draw().unwrap();

        let text = String::from_utf8(terminal.into_inner()).unwrap();
        assert!(text.ends_with("\x1b[2;1H\x1b[K"));
    }
}
