//! Leaderboard statistics.

use tracing::instrument;
use xlive_core::{Result, SessionId, XliveError, Xuid};

use crate::client::BackendClient;
use crate::types::{StatsQuery, StatsRow, StatsView, StatsWrite};

impl BackendClient {
    /// Write `views` for `xuid` in `session`.
    #[instrument(skip_all, fields(%session, %xuid, views = views.len()))]
    pub fn write_stats(&self, session: SessionId, xuid: Xuid, views: Vec<StatsView>) -> Result<()> {
        if !xuid.is_valid() {
            return Err(XliveError::invalid_parameter("stats xuid is zero"));
        }
        if views.is_empty() {
            return Ok(());
        }
        let path = self.session_path(session, "/leaderboards");
        let body = StatsWrite { xuid, views };
        self.post(&path, &body).into_result(&path).map(drop)
    }

    /// Rows for `xuids` across `view_ids`.
    #[instrument(skip_all, fields(players = xuids.len(), views = view_ids.len()))]
    pub fn read_stats(&self, view_ids: &[u32], xuids: &[Xuid]) -> Result<Vec<StatsRow>> {
        let path = self.title_path("leaderboards/find");
        let query = StatsQuery {
            players: xuids.to_vec(),
            view_ids: view_ids.to_vec(),
        };
        self.post(&path, &query).into_typed(&path)
    }
}
