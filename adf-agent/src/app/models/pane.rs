//! Panel focus

/// Which panel the scroll keys act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Summary,
    Details,
}

impl Pane {
    pub fn next(self) -> Self {
        match self {
            Pane::Summary => Pane::Details,
            Pane::Details => Pane::Summary,
        }
    }
}
