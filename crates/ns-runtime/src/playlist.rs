use std::rc::Rc;

use ns_core::{Command, PlaybackSpot, ResourceProvider, Script, ScriptError};
use tokio::task::JoinSet;
use tracing::debug;

pub type PreloadProgress = Rc<dyn Fn(f32)>;

/// Commands of one script in playback order.
#[derive(Debug, Clone)]
pub struct ScriptPlaylist {
    script: Rc<Script>,
    commands: Vec<Rc<dyn Command>>,
}

impl ScriptPlaylist {
    pub fn new(script: Rc<Script>) -> Self {
        let commands = script.extract_commands();
        Self { script, commands }
    }

    pub fn script(&self) -> &Rc<Script> {
        &self.script
    }

    pub fn script_name(&self) -> &str {
        self.script.name()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Rc<dyn Command>> {
        self.commands.get(index)
    }

    pub fn get_command_by_index(&self, index: usize) -> Option<Rc<dyn Command>> {
        self.commands.get(index).cloned()
    }

    pub fn is_index_valid(&self, index: usize) -> bool {
        index < self.commands.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn Command>> {
        self.commands.iter()
    }

    pub fn index_of(&self, spot: &PlaybackSpot) -> Option<usize> {
        if spot.script_name != self.script.name() {
            return None;
        }
        self.commands
            .binary_search_by(|command| command.spot().position().cmp(&spot.position()))
            .ok()
    }

    /// Index of the first command at or after `(line_index, inline_index)`.
    pub fn index_after_line(&self, line_index: usize, inline_index: usize) -> Option<usize> {
        let target = (line_index, inline_index);
        let index = self
            .commands
            .partition_point(|command| command.spot().position() < target);
        self.is_index_valid(index).then_some(index)
    }

    /// Index of the last command at or before `(line_index, inline_index)`.
    pub fn index_before_line(&self, line_index: usize, inline_index: usize) -> Option<usize> {
        let target = (line_index, inline_index);
        self.commands
            .partition_point(|command| command.spot().position() <= target)
            .checked_sub(1)
    }

    pub fn get_command_after_line(
        &self,
        line_index: usize,
        inline_index: usize,
    ) -> Option<Rc<dyn Command>> {
        self.index_after_line(line_index, inline_index)
            .and_then(|index| self.get_command_by_index(index))
    }

    pub fn get_command_before_line(
        &self,
        line_index: usize,
        inline_index: usize,
    ) -> Option<Rc<dyn Command>> {
        self.index_before_line(line_index, inline_index)
            .and_then(|index| self.get_command_by_index(index))
    }

    fn check_range(&self, start: usize, end: usize) -> Result<(), ScriptError> {
        if start > end || end >= self.commands.len() {
            return Err(ScriptError::new(
                "PLAYLIST_PRELOAD_RANGE",
                format!(
                    "Preload range {}..={} is invalid for \"{}\" with {} commands.",
                    start,
                    end,
                    self.script.name(),
                    self.commands.len()
                ),
            ));
        }
        Ok(())
    }

    /// Runs the preload hook of every preloadable command in `start..=end` concurrently.
    /// Must be called from within a `LocalSet`.
    pub async fn preload_resources(
        &self,
        start: usize,
        end: usize,
        resources: Rc<dyn ResourceProvider>,
        holder: &str,
        progress: Option<PreloadProgress>,
    ) -> Result<(), ScriptError> {
        if self.commands.is_empty() {
            if let Some(progress) = &progress {
                progress(1.0);
            }
            return Ok(());
        }
        self.check_range(start, end)?;

        let mut tasks = JoinSet::new();
        for command in &self.commands[start..=end] {
            if let Some(preloadable) = command.as_preloadable() {
                let future = preloadable.preload_resources(resources.clone(), holder.to_string());
                tasks.spawn_local(future);
            }
        }

        let total = tasks.len();
        debug!(
            script = self.script.name(),
            start, end, total, "preloading playlist resources"
        );
        if total == 0 {
            if let Some(progress) = &progress {
                progress(1.0);
            }
            return Ok(());
        }

        let mut finished = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|error| {
                ScriptError::new(
                    "PLAYLIST_PRELOAD_FAILED",
                    format!("Preload task failed: {}", error),
                )
            })?;
            result?;
            finished += 1;
            if let Some(progress) = &progress {
                progress(finished as f32 / total as f32);
            }
        }
        Ok(())
    }

    pub fn release_preloaded_resources(
        &self,
        start: usize,
        end: usize,
        resources: &dyn ResourceProvider,
        holder: &str,
    ) -> Result<(), ScriptError> {
        if self.commands.is_empty() {
            return Ok(());
        }
        self.check_range(start, end)?;
        for command in &self.commands[start..=end] {
            if let Some(preloadable) = command.as_preloadable() {
                preloadable.release_preloaded_resources(resources, holder);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    use ns_commands::builtin_registry;
    use ns_compiler::{parse_script, ParseOptions};
    use tokio::task::LocalSet;

    use crate::services::CountingResourceProvider;

    fn playlist(text: &str) -> ScriptPlaylist {
        let result = parse_script(&builtin_registry(), "main", text, &ParseOptions::default());
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        ScriptPlaylist::new(Rc::new(result.script))
    }

    fn positions(playlist: &ScriptPlaylist) -> Vec<(usize, usize)> {
        playlist
            .iter()
            .map(|command| command.spot().position())
            .collect()
    }

    fn run<F: std::future::Future>(future: F) -> F::Output {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime should build");
        LocalSet::new().block_on(&runtime, future)
    }

    fn recorder() -> (Rc<RefCell<Vec<f32>>>, PreloadProgress) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, Rc::new(move |value| sink.borrow_mut().push(value)))
    }

    #[test]
    fn commands_follow_extract_commands_order() {
        let playlist = playlist("Alice.Happy: Hi.\n; note\n# Label\n@set score=1\nBye.");
        let extracted = playlist
            .script()
            .extract_commands()
            .iter()
            .map(|command| command.spot().position())
            .collect::<Vec<_>>();

        assert_eq!(positions(&playlist), extracted);
        assert_eq!(positions(&playlist), vec![(0, 0), (0, 1), (3, 0), (4, 0)]);
        assert_eq!(playlist.index_of(&PlaybackSpot::new("main", 3, 0)), Some(2));
        assert_eq!(playlist.index_of(&PlaybackSpot::new("main", 1, 0)), None);
        assert_eq!(playlist.index_of(&PlaybackSpot::new("other", 0, 0)), None);
    }

    #[test]
    fn line_lookups_pick_the_nearest_command() {
        let playlist = playlist("Alice.Happy: Hi.\n; note\nBye.");

        let after = playlist.get_command_after_line(1, 0).expect("command after comment");
        assert_eq!(after.spot().position(), (2, 0));
        let before = playlist
            .get_command_before_line(1, 0)
            .expect("command before comment");
        assert_eq!(before.spot().position(), (0, 1));

        let exact = playlist.get_command_before_line(0, 0).expect("exact match");
        assert_eq!(exact.spot().position(), (0, 0));
        assert_eq!(
            playlist
                .get_command_after_line(0, 1)
                .map(|command| command.spot().position()),
            Some((0, 1))
        );
        assert!(playlist.get_command_after_line(3, 0).is_none());
        assert_eq!(playlist.index_before_line(5, 0), Some(2));
    }

    #[test]
    fn preload_rejects_inverted_and_out_of_bounds_ranges() {
        run(async {
            let playlist = playlist("One.\nTwo.");
            let resources = Rc::new(CountingResourceProvider::new());

            let error = playlist
                .preload_resources(1, 0, resources.clone(), "test", None)
                .await
                .expect_err("inverted range should fail");
            assert_eq!(error.code, "PLAYLIST_PRELOAD_RANGE");

            let error = playlist
                .preload_resources(0, 2, resources.clone(), "test", None)
                .await
                .expect_err("out of bounds range should fail");
            assert_eq!(error.code, "PLAYLIST_PRELOAD_RANGE");

            let error = playlist
                .release_preloaded_resources(0, 5, resources.as_ref(), "test")
                .expect_err("out of bounds release should fail");
            assert_eq!(error.code, "PLAYLIST_PRELOAD_RANGE");
        });
    }

    #[test]
    fn empty_playlist_reports_full_progress() {
        run(async {
            let playlist = playlist("; only a comment\n# Label");
            assert!(playlist.is_empty());

            let (seen, progress) = recorder();
            let resources = Rc::new(CountingResourceProvider::new());
            playlist
                .preload_resources(0, 0, resources, "test", Some(progress))
                .await
                .expect("empty preload should pass");
            assert_eq!(*seen.borrow(), vec![1.0]);
        });
    }

    #[test]
    fn preload_reports_progress_and_release_frees_holders() {
        run(async {
            let playlist = playlist("Alice.Happy: Hi.\nBob.Sad: Yo.\nDone.");
            let resources = Rc::new(CountingResourceProvider::new());

            let (seen, progress) = recorder();
            let end = playlist.len() - 1;
            playlist
                .preload_resources(0, end, resources.clone(), "test", Some(progress))
                .await
                .expect("preload should pass");
            assert_eq!(*seen.borrow(), vec![0.5, 1.0]);
            assert_eq!(resources.holder_count("Characters/Alice/Happy"), 1);
            assert_eq!(resources.holder_count("Characters/Bob/Sad"), 1);

            playlist
                .release_preloaded_resources(0, end, resources.as_ref(), "test")
                .expect("release should pass");
            assert!(resources.loaded_paths().is_empty());
        });
    }
}
