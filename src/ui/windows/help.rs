use ratatui::{
    Frame,
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

pub struct HelpWindow;

const HELP_TEXT: &[&str] = &[
    " Playback:",
    "   Space / p         Play / Pause",
    "   r                 Restart (stop at first word)",
    "",
    " Navigation:",
    "   h / Left          Previous Word",
    "   l / Right         Next Word",
    "   [ / ]             Back / Forward 10 Words",
    "   0 - 9             Seek to 0% - 90%",
    "",
    " Bookmark:",
    "   b                 Set Bookmark",
    "   B                 Resume From Bookmark",
    "",
    " Speed & Display:",
    "   + / =             Faster",
    "   -                 Slower",
    "   m                 Toggle Single / Chunked",
    "   < / >             Smaller / Larger Chunk",
    "   s                 Toggle Sentence Pause",
    "   v                 Toggle Speed Variability",
    "",
    "   ?                 Help",
    "   q / Esc           Quit / Close Window",
];

impl HelpWindow {
    pub fn total_lines() -> usize {
        HELP_TEXT.len()
    }

    pub fn render(frame: &mut Frame, area: Rect, scroll_offset: u16) {
        let help_content: Vec<Line> = HELP_TEXT.iter().map(|&s| Line::from(s)).collect();

        let max_width = help_content.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
        let width = (max_width + 4).min(area.width);
        let height = (help_content.len() as u16 + 2).min(area.height);

        let x = area.x + (area.width - width) / 2;
        let y = area.y + (area.height - height) / 2;
        let popup_area = Rect::new(x, y, width, height);

        frame.render_widget(Clear, popup_area);

        let help_paragraph = Paragraph::new(help_content)
            .block(Block::default().title("Help").borders(Borders::ALL))
            .scroll((scroll_offset, 0));

        frame.render_widget(help_paragraph, popup_area);
    }
}
