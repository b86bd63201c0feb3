use crate::app::{Modal, Scene};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use pocketpet::{AnimationCue, AvatarId, Mood, Snapshot};
use std::io::{self, Write};

/// Placeholder for the right half of a double-width glyph.
const WIDE_TAIL: char = '\0';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            *c = Cell {
                bg,
                ..Cell::default()
            };
        }
    }
}

pub(crate) struct Terminal {
    out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] || c.ch == WIDE_TAIL {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

pub(crate) struct Palette {
    pub(crate) fg: Color,
    pub(crate) dim: Color,
    pub(crate) hi: Color,
    pub(crate) bg: Color,
    pub(crate) color: bool,
}

impl Palette {
    pub(crate) fn new(color: bool) -> Self {
        Self {
            fg: Color::White,
            dim: Color::DarkGrey,
            hi: if color { Color::Yellow } else { Color::White },
            bg: Color::Black,
            color,
        }
    }

    fn pick(&self, c: Color) -> Color {
        if self.color {
            c
        } else {
            self.fg
        }
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

fn draw_centered(buf: &mut CellBuffer, y: u16, s: &str, fg: Color, bg: Color) {
    let len = s.chars().count() as u16;
    let x = buf.w.saturating_sub(len) / 2;
    draw_text(buf, x, y, s, fg, bg);
}

/// Emoji take two columns; the second is reserved so `present` skips it.
fn draw_glyph(buf: &mut CellBuffer, x: u16, y: u16, glyph: &str, bg: Color) {
    let Some(ch) = glyph.chars().next() else {
        return;
    };
    buf.set(
        x,
        y,
        Cell {
            ch,
            fg: Color::White,
            bg,
        },
    );
    buf.set(
        x.saturating_add(1),
        y,
        Cell {
            ch: WIDE_TAIL,
            fg: Color::White,
            bg,
        },
    );
}

fn bar(value: u8, width: usize) -> String {
    let fill = (value as usize * width + 50) / 100;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { ' ' });
    }
    s.push(']');
    s
}

fn pet_art(avatar: AvatarId) -> [&'static str; 4] {
    match avatar {
        AvatarId::Dog => [r"  / \__    ", r" (    @\___", r" /         O", r"/   (_____/ "],
        AvatarId::Cat => [r"  /\_/\    ", r" ( o.o )   ", r"  > ^ <    ", r" (_____)~  "],
        AvatarId::Bird => [r"   ,_      ", r"  >' )     ", r"  ( ( \    ", r"   ''|\    "],
        AvatarId::Turtle => [r"    ____   ", r"  _/____\_ ", r" (_|_||_|_)@", r"   ^    ^  "],
    }
}

fn draw_pet(buf: &mut CellBuffer, snap: &Snapshot, pal: &Palette, cx: u16, cy: u16) {
    let stats = snap.stats;
    let art = pet_art(stats.avatar_id);

    let (dx, dy): (i32, i32) = match snap.animation {
        Some(AnimationCue::Bounce) => (0, -1),
        Some(AnimationCue::Wiggle) => (if (snap.now / 120) % 2 == 0 { -1 } else { 1 }, 0),
        _ => (0, 0),
    };
    let fg = match snap.mood {
        Mood::Sad => pal.dim,
        Mood::Glowing => pal.pick(Color::Magenta),
        Mood::Content => pal.fg,
    };

    let w = art[0].chars().count() as i32;
    let x0 = cx as i32 - w / 2 + dx;
    let y0 = cy as i32 - art.len() as i32 / 2 + dy;
    for (row, line) in art.iter().enumerate() {
        let y = y0 + row as i32;
        if y < 0 || x0 < 0 {
            continue;
        }
        draw_text(buf, x0 as u16, y as u16, line, fg, pal.bg);
    }

    let glyph_y = (y0 - 2).max(0) as u16;
    draw_glyph(
        buf,
        cx.saturating_sub(1),
        glyph_y,
        stats.avatar_id.glyph(stats.evolved),
        pal.bg,
    );
    if stats.evolved {
        draw_text(buf, cx.saturating_sub(5), glyph_y, "*", pal.hi, pal.bg);
        draw_text(buf, cx + 4, glyph_y, "*", pal.hi, pal.bg);
    }
    if snap.animation == Some(AnimationCue::Doze) {
        draw_text(buf, (x0 + w + 1).max(0) as u16, (y0 - 1).max(0) as u16, "z Z", pal.dim, pal.bg);
    }
}

fn draw_confetti(buf: &mut CellBuffer, snap: &Snapshot, pal: &Palette) {
    const COLORS: [Color; 5] = [
        Color::Red,
        Color::Yellow,
        Color::Green,
        Color::Cyan,
        Color::Magenta,
    ];
    let frame = snap.now / 150;
    for i in 0..60u64 {
        let h = (i.wrapping_mul(0x9E37_79B9) ^ frame.wrapping_mul(0x85EB_CA6B)).wrapping_mul(2654435761);
        let x = (h % buf.w.max(1) as u64) as u16;
        let y = ((h >> 16) % buf.h.max(1) as u64) as u16;
        let c = pal.pick(COLORS[(i % COLORS.len() as u64) as usize]);
        let ch = if i % 3 == 0 { '*' } else { '.' };
        buf.set(x, y, Cell { ch, fg: c, bg: pal.bg });
    }
}

pub(crate) fn draw_main(buf: &mut CellBuffer, snap: &Snapshot, pal: &Palette) {
    let name = snap
        .profile
        .as_ref()
        .map(|p| p.name.as_str())
        .unwrap_or("Pet Name");
    let evolved = if snap.stats.evolved { "  (evolved)" } else { "" };
    draw_centered(buf, 1, &format!("{name}{evolved}"), pal.fg, pal.bg);

    let mid = buf.w / 2;
    draw_pet(buf, snap, pal, mid, 7);

    let meters = [
        ("Hunger   ", snap.stats.hunger, Color::Blue),
        ("Energy   ", snap.stats.energy, Color::Green),
        ("Happiness", snap.stats.happiness, Color::Yellow),
    ];
    let x = mid.saturating_sub(18);
    for (i, (label, value, color)) in meters.iter().enumerate() {
        let line = format!("{label} {} {:>3}", bar(*value, 20), value);
        draw_text(buf, x, 12 + i as u16, &line, pal.pick(*color), pal.bg);
    }

    let keys = [
        ("f", "Feed", snap.stats.hunger),
        ("s", "Sleep", snap.stats.energy),
        ("p", "Play", snap.stats.happiness),
    ];
    let mut kx = x;
    for (key, label, value) in keys {
        let fg = if value >= 100 { pal.dim } else { pal.fg };
        let s = format!("[{key}] {label}");
        draw_text(buf, kx, 16, &s, fg, pal.bg);
        kx += s.chars().count() as u16 + 3;
    }

    if let Some(toast) = &snap.toast {
        draw_centered(buf, 18, toast, pal.hi, pal.bg);
    }
    if snap.celebrating {
        draw_confetti(buf, snap, pal);
    }

    draw_text(
        buf,
        1,
        buf.h.saturating_sub(1),
        "q quit | f feed | s sleep | p play | o settings | i info | c color",
        pal.dim,
        pal.bg,
    );
}

pub(crate) fn draw_onboarding(
    buf: &mut CellBuffer,
    snap: &Snapshot,
    name_edit: &str,
    pal: &Palette,
) {
    let mut body = String::from("Choose your pet with ← →\n\n");
    for a in AvatarId::ALL {
        let mark = if a == snap.selected_avatar { '>' } else { ' ' };
        body.push_str(&format!("   {mark} {}\n", a.as_str()));
    }
    let mut preview = name_edit.to_string();
    if preview.chars().count() < pocketpet::model::NAME_MAX_CHARS {
        preview.push('_');
    }
    body.push_str(&format!("\nName your pet: {preview}\n\nEnter to start caring"));
    draw_center_box(buf, "Welcome!", &body, pal);
    if let Some((x0, y0, _, _)) = box_rect(buf) {
        draw_glyph(buf, x0 + 12, y0 + 1, snap.selected_avatar.glyph(false), pal.bg);
    }
}

pub(crate) fn draw_modal(buf: &mut CellBuffer, modal: Modal, snap: &Snapshot, pal: &Palette) {
    match modal {
        Modal::Evolved => {
            let glyph = snap.stats.avatar_id.glyph(true);
            draw_center_box(
                buf,
                "Your pet evolved!",
                &format!("{glyph}\n\nYou're a great caretaker!\n\nEnter to continue"),
                pal,
            );
        }
        Modal::Secret => draw_center_box(
            buf,
            "You discovered the secret ritual!",
            "+10 boost to all stats!\n\nEnter to continue",
            pal,
        ),
        Modal::Info => draw_center_box(
            buf,
            "Virtual Pet Rules & Info",
            "Name and choose your pet on first visit (o: settings).\n\
             Keep Hunger, Energy and Happiness above 0.\n\
             Stats drop every 10 seconds; feed, sleep, play.\n\
             Random events can boost stats every 30 seconds.\n\
             All stats above 80 for 1 minute: your pet evolves!\n\
             Secret: Feed 3x, then Play, then Sleep (in 60s).\n\
             Progress is saved locally.\n\n\
             Esc or i to close",
            pal,
        ),
    }
}

/// `(x0, y0, width, height)` of the centered dialog, if the terminal fits one.
fn box_rect(buf: &CellBuffer) -> Option<(u16, u16, u16, u16)> {
    let bw = 60.min(buf.w.saturating_sub(4));
    let bh = 18.min(buf.h.saturating_sub(4));
    if bw < 2 || bh < 2 {
        return None;
    }
    Some(((buf.w - bw) / 2, (buf.h - bh) / 2, bw, bh))
}

pub(crate) fn draw_center_box(buf: &mut CellBuffer, title: &str, body: &str, pal: &Palette) {
    let Some((x0, y0, bw, bh)) = box_rect(buf) else {
        return;
    };

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            buf.set(x, y, Cell { bg: pal.bg, ..Cell::default() });
        }
    }

    let edge = |ch: char| Cell {
        ch,
        fg: pal.fg,
        bg: pal.bg,
    };
    for x in x0..x0 + bw {
        buf.set(x, y0, edge('─'));
        buf.set(x, y0 + bh - 1, edge('─'));
    }
    for y in y0..y0 + bh {
        buf.set(x0, y, edge('│'));
        buf.set(x0 + bw - 1, y, edge('│'));
    }
    buf.set(x0, y0, edge('┌'));
    buf.set(x0 + bw - 1, y0, edge('┐'));
    buf.set(x0, y0 + bh - 1, edge('└'));
    buf.set(x0 + bw - 1, y0 + bh - 1, edge('┘'));

    draw_text(buf, x0 + 2, y0 + 1, title, pal.hi, pal.bg);

    let mut yy = y0 + 3;
    for line in body.lines() {
        if yy >= y0 + bh - 1 {
            break;
        }
        draw_text(buf, x0 + 2, yy, line, pal.fg, pal.bg);
        yy += 1;
    }
}

pub(crate) fn draw_scene(
    buf: &mut CellBuffer,
    scene: Scene,
    snap: &Snapshot,
    name_edit: &str,
    pal: &Palette,
) {
    buf.clear(pal.bg);
    draw_main(buf, snap, pal);
    match scene {
        Scene::Main => {}
        Scene::Onboarding => draw_onboarding(buf, snap, name_edit, pal),
        Scene::Modal(m) => draw_modal(buf, m, snap, pal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(bar(0, 4), "[    ]");
        assert_eq!(bar(50, 4), "[██  ]");
        assert_eq!(bar(100, 4), "[████]");
    }

    #[test]
    fn text_is_clipped_to_buffer() {
        let mut b = CellBuffer::new(4, 1);
        draw_text(&mut b, 2, 0, "hello", Color::White, Color::Black);
        assert_eq!(b.cells[2].ch, 'h');
        assert_eq!(b.cells[3].ch, 'e');
    }
}
