use tui::style::{Color, Modifier, Style};

/// Named colors shared by the board widgets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tone {
    Primary,
    Accent,
    Dim,
    Winner,
    Qualified,
    Selected,
    Error,
}

pub fn style(tone: Tone) -> Style {
    match tone {
        Tone::Primary => Style::default().fg(Color::Rgb(0, 133, 63)),
        Tone::Accent => Style::default().fg(Color::Rgb(253, 239, 66)).add_modifier(Modifier::BOLD),
        Tone::Dim => Style::default().fg(Color::Indexed(240)),
        Tone::Winner => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        Tone::Qualified => Style::default().fg(Color::Rgb(0, 133, 63)).add_modifier(Modifier::BOLD),
        Tone::Selected => Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        Tone::Error => Style::default().fg(Color::Rgb(227, 27, 35)),
    }
}
