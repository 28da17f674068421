use services::{SessionPhase, SessionSnapshot, TileCategory};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigatorTileVm {
    pub index: usize,
    pub label: String,
    pub category: TileCategory,
    pub enabled: bool,
    pub is_marked_for_review: bool,
}

/// Question grid. Tiles are disabled for locked questions and once the session ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigatorVm {
    pub tiles: Vec<NavigatorTileVm>,
    pub submitted: usize,
    pub visited: usize,
    pub unvisited: usize,
}

impl NavigatorVm {
    #[must_use]
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let open = !matches!(snapshot.phase, SessionPhase::Ended(_));
        let tiles: Vec<_> = snapshot
            .tiles
            .iter()
            .map(|tile| NavigatorTileVm {
                index: tile.index,
                label: (tile.index + 1).to_string(),
                category: tile.category,
                enabled: open && tile.navigable && tile.category != TileCategory::Current,
                is_marked_for_review: tile.is_marked_for_review,
            })
            .collect();

        let count = |category: TileCategory| tiles.iter().filter(|t| t.category == category).count();
        Self {
            submitted: count(TileCategory::SubmittedLocked),
            visited: count(TileCategory::VisitedUnsubmitted),
            unvisited: count(TileCategory::Unvisited),
            tiles,
        }
    }
}
