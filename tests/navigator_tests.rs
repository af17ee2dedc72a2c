mod common;

use common::*;
use sortiv::navigator::NO_IMAGES;
use sortiv::{Action, NavState, Navigator, TransferMode, ViewMode, ViewerConfig, ViewerError};
use std::fs;

#[cfg(test)]
mod navigation_tests {
    use super::*;

    #[test]
    fn open_puts_index_in_range_or_empty() {
        for n in 0..4 {
            let all = ["a.png", "b.png", "c.png"];
            let pics = folder_with(&all[..n.min(3)]);
            let nav = Navigator::open(pics.path(), small_config()).unwrap();
            match nav.state() {
                NavState::Empty => assert_eq!(nav.len(), 0),
                NavState::Showing(i) => assert!(i < nav.len()),
                other => panic!("unexpected state {other:?}"),
            }
        }
    }

    #[test]
    fn empty_folder_reports_no_images() {
        let pics = folder_with(&[]);
        fs::write(pics.file("notes.txt"), b"hello").unwrap();
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();

        assert_eq!(nav.state(), NavState::Empty);
        assert_eq!(nav.status_message(), NO_IMAGES);
        nav.handle(Action::NavigateRight, TransferMode::Move).unwrap();
        assert_eq!(nav.state(), NavState::Empty);
        assert!(nav.current_bitmap().is_none());
    }

    #[test]
    fn missing_folder_is_a_folder_error() {
        let pics = folder_with(&[]);
        let err = Navigator::open(&pics.file("nope"), small_config()).err().unwrap();
        assert!(matches!(err, ViewerError::Folder { .. }), "{err}");
    }

    #[test]
    fn navigation_wraps_at_both_ends() {
        let pics = folder_with(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();

        nav.handle(Action::NavigateLeft, TransferMode::Move).unwrap();
        assert_eq!(nav.state(), NavState::Showing(2));
        nav.handle(Action::NavigateRight, TransferMode::Move).unwrap();
        assert_eq!(nav.state(), NavState::Showing(0));
    }

    #[test]
    fn single_image_wraps_onto_itself() {
        let pics = folder_with(&["only.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        nav.handle(Action::NavigateRight, TransferMode::Move).unwrap();
        assert_eq!(nav.state(), NavState::Showing(0));
        nav.handle(Action::NavigateLeft, TransferMode::Move).unwrap();
        assert_eq!(nav.state(), NavState::Showing(0));
        assert!(nav.current_bitmap().is_some());
    }

    #[test]
    fn first_and_last_jump() {
        let pics = folder_with(&["a.png", "b.png", "c.png", "d.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        nav.handle(Action::Last, TransferMode::Move).unwrap();
        assert_eq!(current_name(&nav).as_deref(), Some("d.png"));
        nav.handle(Action::First, TransferMode::Move).unwrap();
        assert_eq!(current_name(&nav).as_deref(), Some("a.png"));
    }

    #[test]
    fn current_bitmap_matches_current_file() {
        let pics = folder_with(&["a.png", "b.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        let img = nav.current_bitmap().unwrap();
        assert_eq!((img.width, img.height), (8, 8));
        let id = nav.current_identity().unwrap().clone();
        assert!(nav.is_cached(&id));
    }

    #[test]
    fn neighbours_get_preloaded() {
        let pics = folder_with(&["a.png", "b.png", "c.png", "d.png", "e.png"]);
        let nav = Navigator::open(pics.path(), small_config()).unwrap();
        let listing = nav.listing();
        // window around index 0, forward: b (next), e (previous, wrapped), c
        assert!(eventually(|| nav.is_cached(&listing[1])));
        assert!(eventually(|| nav.is_cached(&listing[4])));
        assert!(eventually(|| nav.is_cached(&listing[2])));
    }

    #[test]
    fn cache_stays_within_budget_and_keeps_current() {
        let files: Vec<String> = (0..12).map(|n| format!("img{n:02}.png")).collect();
        let refs: Vec<&str> = files.iter().map(String::as_str).collect();
        let pics = folder_with(&refs);
        // room for two 256-byte frames
        let config = ViewerConfig {
            cache_budget: 600,
            ..small_config()
        };
        let mut nav = Navigator::open(pics.path(), config).unwrap();

        let moves = [
            Action::NavigateRight,
            Action::NavigateRight,
            Action::NavigateLeft,
            Action::Last,
            Action::NavigateRight,
            Action::NavigateRight,
            Action::NavigateLeft,
        ];
        for action in moves {
            nav.handle(action, TransferMode::Move).unwrap();
            let info = nav.info(TransferMode::Move);
            assert!(info.cached_bytes <= info.cache_budget);
            let cur = nav.current_identity().unwrap().clone();
            assert!(nav.is_cached(&cur), "current evicted after {action:?}");
        }
    }

    #[test]
    fn undecodable_images_are_skipped() {
        let pics = folder_with(&["a.png", "c.png"]);
        write_garbage(pics.path(), "b.png");
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        assert_eq!(nav.len(), 3);

        nav.handle(Action::NavigateRight, TransferMode::Move).unwrap();
        assert_eq!(current_name(&nav).as_deref(), Some("c.png"));
        assert!(nav.status_message().starts_with("Skipped b.png"), "{}", nav.status_message());
        assert_eq!(names(&nav), ["a.png", "c.png"]);
        // still on disk
        assert!(pics.file("b.png").exists());
    }

    #[test]
    fn skipping_backwards_lands_on_the_previous_image() {
        let pics = folder_with(&["a.png", "b.png"]);
        write_garbage(pics.path(), "c.png");
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();

        nav.handle(Action::NavigateLeft, TransferMode::Move).unwrap();
        assert_eq!(current_name(&nav).as_deref(), Some("b.png"));
        assert_eq!(nav.len(), 2);
    }

    #[test]
    fn folder_of_only_garbage_ends_empty() {
        let pics = folder_with(&[]);
        write_garbage(pics.path(), "x.jpg");
        write_garbage(pics.path(), "y.jpg");
        let nav = Navigator::open(pics.path(), small_config()).unwrap();
        assert_eq!(nav.state(), NavState::Empty);
        assert_eq!(nav.len(), 0);
    }

    #[test]
    fn unreadable_image_keeps_its_place_and_retries() {
        let pics = folder_with(&["a.png", "b.png", "c.png", "d.png", "e.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        // d is outside the window around a, so it was never decoded
        fs::remove_file(pics.file("d.png")).unwrap();

        for _ in 0..3 {
            nav.handle(Action::NavigateRight, TransferMode::Move).unwrap();
        }
        assert_eq!(nav.state(), NavState::Showing(3));
        assert_eq!(current_name(&nav).as_deref(), Some("d.png"));
        assert!(nav.status_message().starts_with("Error"), "{}", nav.status_message());
        assert_eq!(nav.len(), 5);
        assert!(nav.current_bitmap().is_none());

        write_image(pics.path(), "d.png", 3);
        let img = nav.current_bitmap().unwrap();
        assert_eq!((img.width, img.height), (8, 8));
        assert_eq!(nav.state(), NavState::Showing(3));
    }

    #[test]
    fn snapshot_reports_the_callers_mode() {
        let pics = folder_with(&["a.png", "b.png"]);
        let nav = Navigator::open(pics.path(), small_config()).unwrap();
        let info = nav.info(TransferMode::Copy);
        assert_eq!(info.mode, TransferMode::Copy);
        assert_eq!(info.view, ViewMode::Single);
        assert_eq!((info.position, info.total), (Some(0), 2));
        assert_eq!(info.file_name.as_deref(), Some("a.png"));
    }
}

#[cfg(test)]
mod grid_tests {
    use super::*;

    #[test]
    fn grid_view_fills_in_every_thumbnail() {
        let pics = folder_with(&["a.png", "b.png", "c.png", "d.png", "e.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        assert_eq!(nav.info(TransferMode::Move).thumbnails, 0);

        nav.set_view(ViewMode::Grid);
        assert_eq!(nav.view(), ViewMode::Grid);
        let listing = nav.listing();
        assert!(eventually(|| listing.iter().all(|id| nav.thumbnail(id).is_some())));
        assert_eq!(nav.info(TransferMode::Move).thumbnails, 5);
        let thumb = nav.thumbnail(&listing[2]).unwrap();
        assert_eq!((thumb.width, thumb.height), (8, 8));

        // navigation still works while the grid is up
        nav.handle(Action::Last, TransferMode::Move).unwrap();
        assert_eq!(nav.state(), NavState::Showing(4));
        nav.set_view(ViewMode::Single);
        assert_eq!(nav.view(), ViewMode::Single);
    }

    #[test]
    fn removed_images_lose_their_thumbnail() {
        let pics = folder_with(&["a.png", "b.png", "c.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        nav.set_view(ViewMode::Grid);
        let gone = nav.current_identity().unwrap().clone();
        assert!(eventually(|| nav.thumbnail(&gone).is_some()));

        nav.handle(Action::FileToBucket(2), TransferMode::Move).unwrap();
        assert!(nav.wait_idle(WAIT));
        assert!(nav.thumbnail(&gone).is_none());
        assert_eq!(nav.len(), 2);
    }

    #[test]
    fn contact_sheet_lands_in_the_given_folder() {
        let pics = folder_with(&["a.png", "b.png", "c.png"]);
        let out = tempfile::TempDir::new().unwrap();
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();

        let path = nav.save_contact_sheet(out.path()).unwrap().unwrap();
        assert!(path.starts_with(out.path()));
        assert!(nav.status_message().starts_with("Saved contact_sheet_"), "{}", nav.status_message());
        let sheet = image::open(&path).unwrap();
        assert_eq!((sheet.width(), sheet.height()), (400, 400));
        // the listing is untouched
        assert_eq!(nav.len(), 3);
    }

    #[test]
    fn contact_sheet_of_nothing_writes_nothing() {
        let pics = folder_with(&[]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        assert!(nav.save_contact_sheet(pics.path()).unwrap().is_none());
        assert_eq!(nav.status_message(), NO_IMAGES);
        assert_eq!(fs::read_dir(pics.path()).unwrap().count(), 0);
    }
}
