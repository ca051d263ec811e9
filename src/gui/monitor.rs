use crate::geometry::{planar, Point};
use crate::gui::error::GuiError;
use crate::session::Session;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    symbols,
    widgets::{block::Title, Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Terminal,
};
use std::{
    io,
    time::{Duration, Instant},
};

/// Shows a running session until the user quits or the bridge stops.
///
/// `c` calibrates to the current pose, `r` forgets the calibration, and `q`
/// or escape leaves the monitor. The session keeps running afterwards, it is
/// up to the caller to stop it.
pub fn monitor(session: &mut Session, tick_rate: Duration) -> Result<(), GuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let res = run_app(&mut terminal, session, tick_rate);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(res?)
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    session: &mut Session,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, session))?;
        if session.is_finished() {
            return Ok(());
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('c') => {
                            session.calibrate();
                        }
                        KeyCode::Char('r') => session.reset_calibration(),
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        _ => {}
                    }
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

/// Chart bounds that keep the listener in the middle and the whole array in
/// view.
fn view_around(center: Point, points: &[Point]) -> ([f64; 2], [f64; 2]) {
    let reach = points
        .iter()
        .map(|p| p.abs_dist(&center))
        .fold(0.5, f64::max)
        * 1.5;
    (
        [center.x - reach, center.x + reach],
        [center.y - reach, center.y + reach],
    )
}

fn labels(bounds: [f64; 2]) -> Vec<Span<'static>> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .iter()
        .map(|v| Span::from(format!("{v:.1}")))
        .collect()
}

fn ui(f: &mut Frame, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(f.size());

    let title = Title::from(" opti-ssr ".magenta().bold());
    let latest = session
        .latest_summary()
        .unwrap_or_else(|| "waiting for tracking data...".to_owned());
    let mut lines = vec![Line::from(session.to_string()), Line::from(latest)];
    if let Some(azimuth) = session.azimuth() {
        lines.push(Line::from(format!("reference azimuth {azimuth:.2}°")));
    }
    lines.push(Line::from(" c calibrate   r reset   q quit ".dark_gray()));
    let status = Paragraph::new(lines).block(
        Block::default()
            .title(title.alignment(Alignment::Center))
            .borders(Borders::ALL),
    );
    f.render_widget(status, chunks[0]);

    let center = session
        .latest_pose()
        .map(|p| planar(&p.position))
        .unwrap_or_default();
    let array = session.array_points();
    let (x_bounds, y_bounds) = view_around(center, &array);
    let listener = [(center.x, center.y)];
    let sources: Vec<(f64, f64)> = array.iter().map(|&Point { x, y }| (x, y)).collect();

    let chart = Chart::new(vec![
        Dataset::default()
            .name("Sources")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(&sources),
        Dataset::default()
            .name("Listener")
            .marker(symbols::Marker::Block)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Red))
            .data(&listener),
    ])
    .block(Block::default().title("Floor plan").borders(Borders::ALL))
    .x_axis(
        Axis::default()
            .title(Span::styled("x", Style::default().fg(Color::Red)))
            .style(Style::default().fg(Color::White))
            .bounds(x_bounds)
            .labels(labels(x_bounds)),
    )
    .y_axis(
        Axis::default()
            .title(Span::styled("y", Style::default().fg(Color::Red)))
            .style(Style::default().fg(Color::White))
            .bounds(y_bounds)
            .labels(labels(y_bounds)),
    );
    f.render_widget(chart, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dummy_source::DummySource;
    use crate::renderer::DryRun;
    use crate::session::BoxedSource;
    use ratatui::backend::TestBackend;

    #[test]
    fn view_contains_every_source() {
        let center = Point::new(1.0, 2.0);
        let points = crate::geometry::circular_array(center, 8, 3.0);
        let (x, y) = view_around(center, &points);
        for p in points {
            assert!(x[0] <= p.x && p.x <= x[1]);
            assert!(y[0] <= p.y && p.y <= y[1]);
        }
    }

    #[test]
    fn empty_view_is_not_degenerate() {
        let (x, y) = view_around(Point::default(), &[]);
        assert!(x[1] > x[0] && y[1] > y[0]);
    }

    #[test]
    fn draws_a_session_before_any_data() {
        let source: BoxedSource = Box::new(DummySource::builder().build().unwrap());
        let session = Session::head_tracker(source, Box::new(DryRun::new("test")), &Config::default());
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| ui(f, &session)).unwrap();

        let buffer = terminal.backend().buffer();
        let screen: String = buffer.content.iter().map(|c| c.symbol()).collect();
        assert!(screen.contains("waiting for tracking data"));
        assert!(screen.contains("HeadTracker"));
    }
}
