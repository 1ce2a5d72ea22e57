//! Track library with favorites and playlist filters

use std::collections::HashSet;

use lofi_common::{PlaylistFilter, Track, TrackId};

/// Tracks in source order plus the favorites set
#[derive(Debug, Clone, Default)]
pub struct Library {
    tracks: Vec<Track>,
    favorites: HashSet<TrackId>,
}

impl Library {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            favorites: HashSet::new(),
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id)
    }

    pub fn is_favorite(&self, id: &TrackId) -> bool {
        self.favorites.contains(id)
    }

    /// Flip favorite membership and return the new state
    ///
    /// Toggling twice restores the original set. Unknown ids are ignored and
    /// report `None`.
    pub fn toggle_favorite(&mut self, id: &TrackId) -> Option<bool> {
        self.get(id)?;
        if self.favorites.remove(id) {
            Some(false)
        } else {
            self.favorites.insert(id.clone());
            Some(true)
        }
    }

    /// Ids matching `filter`, in source order
    pub fn filter(&self, filter: &PlaylistFilter) -> Vec<TrackId> {
        self.tracks
            .iter()
            .filter(|track| match filter {
                PlaylistFilter::All => true,
                PlaylistFilter::Favorites => self.favorites.contains(&track.id),
                PlaylistFilter::Category(name) => track
                    .category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(name)),
            })
            .map(|track| track.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lofi_common::catalog::default_tracks;

    #[test]
    fn test_filter_all_keeps_source_order() {
        let lib = Library::new(default_tracks());
        let ids: Vec<_> = lib.filter(&PlaylistFilter::All);
        assert_eq!(
            ids,
            vec![
                TrackId::new("1"),
                TrackId::new("2"),
                TrackId::new("3"),
                TrackId::new("4")
            ]
        );
    }

    #[test]
    fn test_filter_by_category() {
        let lib = Library::new(default_tracks());
        let ids = lib.filter(&PlaylistFilter::Category("lofi".to_string()));
        assert_eq!(ids, vec![TrackId::new("1"), TrackId::new("3")]);
        assert!(lib
            .filter(&PlaylistFilter::Category("jazz".to_string()))
            .is_empty());
    }

    #[test]
    fn test_favorite_toggle_is_an_involution() {
        let mut lib = Library::new(default_tracks());
        let id = TrackId::new("3");

        assert_eq!(lib.toggle_favorite(&id), Some(true));
        assert_eq!(lib.filter(&PlaylistFilter::Favorites), vec![id.clone()]);
        assert_eq!(lib.toggle_favorite(&id), Some(false));
        assert!(lib.filter(&PlaylistFilter::Favorites).is_empty());
    }

    #[test]
    fn test_unknown_favorite_ignored() {
        let mut lib = Library::new(default_tracks());
        assert_eq!(lib.toggle_favorite(&TrackId::new("nope")), None);
    }

    #[test]
    fn test_favorites_follow_source_order() {
        let mut lib = Library::new(default_tracks());
        lib.toggle_favorite(&TrackId::new("4"));
        lib.toggle_favorite(&TrackId::new("2"));
        assert_eq!(
            lib.filter(&PlaylistFilter::Favorites),
            vec![TrackId::new("2"), TrackId::new("4")]
        );
    }
}
