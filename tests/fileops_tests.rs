mod common;

use common::*;
use sortiv::navigator::NO_IMAGES;
use sortiv::{Action, NavState, Navigator, TransferMode, ViewerError};
use std::fs;

#[cfg(test)]
mod fileops_tests {
    use super::*;

    #[test]
    fn example_session_browse_wrap_and_move() {
        let pics = folder_with(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        assert_eq!(nav.state(), NavState::Showing(0));
        assert_eq!(current_name(&nav).as_deref(), Some("a.jpg"));

        nav.handle(Action::NavigateRight, TransferMode::Move).unwrap();
        nav.handle(Action::NavigateRight, TransferMode::Move).unwrap();
        assert_eq!(nav.state(), NavState::Showing(2));
        assert_eq!(current_name(&nav).as_deref(), Some("c.jpg"));

        nav.handle(Action::NavigateRight, TransferMode::Move).unwrap();
        assert_eq!(nav.state(), NavState::Showing(0));

        let moved = nav.current_identity().unwrap().clone();
        nav.handle(Action::FileToBucket(3), TransferMode::Move).unwrap();
        assert!(nav.wait_idle(WAIT));

        assert!(pics.file("3").join("a.jpg").exists());
        assert!(!pics.file("a.jpg").exists());
        assert_eq!(names(&nav), ["b.jpg", "c.jpg"]);
        assert_eq!(nav.state(), NavState::Showing(0));
        assert_eq!(current_name(&nav).as_deref(), Some("b.jpg"));
        assert!(!nav.is_cached(&moved));
        assert_eq!(nav.status_message(), "Moved a.jpg to 3");
    }

    #[test]
    fn moving_the_last_image_wraps_to_the_start() {
        let pics = folder_with(&["a.png", "b.png", "c.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        nav.handle(Action::Last, TransferMode::Move).unwrap();

        nav.handle(Action::FileToBucket(1), TransferMode::Move).unwrap();
        assert!(nav.wait_idle(WAIT));
        assert_eq!(nav.len(), 2);
        assert_eq!(nav.state(), NavState::Showing(0));
        assert_eq!(current_name(&nav).as_deref(), Some("a.png"));
    }

    #[test]
    fn copy_leaves_listing_and_index_alone() {
        let pics = folder_with(&["a.png", "b.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        nav.handle(Action::NavigateRight, TransferMode::Move).unwrap();

        nav.handle(Action::FileToBucket(7), TransferMode::Copy).unwrap();
        assert!(nav.wait_idle(WAIT));

        assert_eq!(nav.len(), 2);
        assert_eq!(nav.state(), NavState::Showing(1));
        assert!(pics.file("b.png").exists());
        assert!(pics.file("7").join("b.png").exists());
        assert_eq!(nav.status_message(), "Copied b.png to 7");
        assert!(nav.current_bitmap().is_some());
    }

    #[test]
    fn conflict_leaves_both_files_untouched() {
        let pics = folder_with(&["a.png", "b.png"]);
        fs::create_dir(pics.file("2")).unwrap();
        fs::write(pics.file("2").join("a.png"), b"already here").unwrap();
        let original = fs::read(pics.file("a.png")).unwrap();
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();

        for mode in [TransferMode::Move, TransferMode::Copy] {
            nav.handle(Action::FileToBucket(2), mode).unwrap();
            assert!(nav.wait_idle(WAIT));
            assert!(
                nav.status_message().starts_with("Error: Destination exists"),
                "{}",
                nav.status_message()
            );
            assert_eq!(nav.state(), NavState::Showing(0));
            assert_eq!(nav.len(), 2);
            assert_eq!(fs::read(pics.file("a.png")).unwrap(), original);
            assert_eq!(fs::read(pics.file("2").join("a.png")).unwrap(), b"already here");
        }
    }

    #[test]
    fn delete_removes_file_and_shows_successor() {
        let pics = folder_with(&["a.png", "b.png", "c.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        nav.handle(Action::NavigateRight, TransferMode::Move).unwrap();
        let deleted = nav.current_identity().unwrap().clone();

        nav.handle(Action::Delete, TransferMode::Move).unwrap();
        assert!(nav.wait_idle(WAIT));

        assert!(!pics.file("b.png").exists());
        assert_eq!(names(&nav), ["a.png", "c.png"]);
        assert_eq!(nav.state(), NavState::Showing(1));
        assert_eq!(current_name(&nav).as_deref(), Some("c.png"));
        assert!(!nav.is_cached(&deleted));
        assert_eq!(nav.status_message(), "Deleted b.png");
    }

    #[test]
    fn deleting_the_sole_image_goes_empty() {
        let pics = folder_with(&["only.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();

        nav.handle(Action::Delete, TransferMode::Move).unwrap();
        assert!(nav.wait_idle(WAIT));
        assert_eq!(nav.state(), NavState::Empty);
        assert!(nav.current_bitmap().is_none());
        assert_eq!(nav.info(TransferMode::Move).cached_frames, 0);

        nav.handle(Action::NavigateRight, TransferMode::Move).unwrap();
        assert_eq!(nav.state(), NavState::Empty);
        assert_eq!(nav.status_message(), NO_IMAGES);
    }

    #[test]
    fn failed_delete_keeps_the_entry() {
        let pics = folder_with(&["a.png", "b.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        // vanish behind the viewer's back
        fs::remove_file(pics.file("a.png")).unwrap();

        nav.handle(Action::Delete, TransferMode::Move).unwrap();
        assert!(nav.wait_idle(WAIT));
        assert_eq!(nav.state(), NavState::Showing(0));
        assert_eq!(nav.len(), 2);
        assert!(nav.status_message().starts_with("Error: I/O error"), "{}", nav.status_message());
    }

    #[test]
    fn actions_while_busy_are_rejected() {
        let pics = folder_with(&["a.png", "b.png", "c.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();

        nav.handle(Action::FileToBucket(5), TransferMode::Move).unwrap();
        assert!(matches!(nav.state(), NavState::Busy { index: 0, .. }));

        let err = nav.handle(Action::FileToBucket(6), TransferMode::Move).unwrap_err();
        assert!(matches!(err, ViewerError::Busy));
        assert!(matches!(
            nav.handle(Action::NavigateRight, TransferMode::Move),
            Err(ViewerError::Busy)
        ));
        assert!(nav.info(TransferMode::Move).busy);

        assert!(nav.wait_idle(WAIT));
        assert!(pics.file("5").join("a.png").exists());
        assert!(!pics.file("6").exists());
        assert_eq!(current_name(&nav).as_deref(), Some("b.png"));
    }

    #[test]
    fn poll_applies_completions_without_blocking() {
        let pics = folder_with(&["a.png", "b.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        nav.handle(Action::FileToBucket(1), TransferMode::Copy).unwrap();
        assert!(eventually(|| nav.poll()));
        assert_eq!(nav.state(), NavState::Showing(0));
    }

    #[test]
    fn bucket_name_taken_by_a_file_is_an_io_error() {
        let pics = folder_with(&["a.png"]);
        fs::write(pics.file("4"), b"i am a file").unwrap();
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();

        nav.handle(Action::FileToBucket(4), TransferMode::Move).unwrap();
        assert!(nav.wait_idle(WAIT));
        assert!(nav.status_message().starts_with("Error: I/O error"), "{}", nav.status_message());
        assert!(pics.file("a.png").exists());
        assert_eq!(nav.len(), 1);
    }

    #[test]
    fn listing_holds_still_until_the_completion_is_applied() {
        let pics = folder_with(&["a.png", "b.png", "c.png"]);
        let mut nav = Navigator::open(pics.path(), small_config()).unwrap();
        nav.handle(Action::Last, TransferMode::Move).unwrap();
        let doomed = nav.current_identity().unwrap().clone();

        nav.handle(Action::Delete, TransferMode::Move).unwrap();
        assert!(eventually(|| !pics.file("c.png").exists()));

        // the file is gone but nothing has been polled yet
        assert!(nav.is_busy());
        let index = nav.index().unwrap();
        assert!(index < nav.len(), "index {} with {} listed", index, nav.len());
        assert_eq!(nav.info(TransferMode::Move).total, 3);
        assert!(nav.listing().contains(&doomed));
        assert_eq!(nav.current_identity(), Some(&doomed));

        assert!(nav.wait_idle(WAIT));
        assert_eq!(nav.state(), NavState::Showing(0));
        assert_eq!(names(&nav), ["a.png", "b.png"]);
        assert!(!nav.is_cached(&doomed));
    }
}
