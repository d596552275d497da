//! Lifecycle tests for the approval workflow and engagement invariants

mod common;

use bookshare_core::{
    ApprovalStatus, LibraryError, NewBook, Principal, StatusKind, SystemRole,
};
use common::{details, isbn, Fixture};

// =============================================================================
// Book identity and visibility
// =============================================================================

#[tokio::test]
async fn test_duplicate_isbn_rejected() {
    let fx = Fixture::new();
    fx.submit("978-0", "Fantasy", 200).await;

    let err = fx
        .library
        .submit_book_for_approval(
            &fx.reader,
            NewBook {
                isbn: isbn("978-0"),
                details: details("Imposter", "Horror", 10),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, LibraryError::DuplicateIsbn("978-0".to_string()));

    // Still exactly one record, still the original
    let snapshot = fx.library.snapshot();
    assert_eq!(snapshot.books.len(), 1);
    assert_eq!(snapshot.books[0].uploader, fx.author);
}

#[tokio::test]
async fn test_duplicate_isbn_rejected_after_approval() {
    let fx = Fixture::new();
    fx.publish("978-0", "Fantasy", 200).await;

    let err = fx
        .library
        .submit_book_for_approval(
            &fx.author,
            NewBook {
                isbn: isbn("978-0"),
                details: details("Again", "Fantasy", 200),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::DuplicateIsbn(_)));
}

#[tokio::test]
async fn test_public_listings_only_show_approved() {
    let fx = Fixture::new();
    fx.publish("978-1", "Fantasy", 200).await;
    fx.submit("978-2", "Fantasy", 200).await;
    let rejected = fx.submit("978-3", "Fantasy", 200).await;
    fx.library
        .approve_book_submission(&fx.admin, &rejected, false, Some("Blurry".to_string()))
        .await
        .unwrap();

    let listed = |books: Vec<bookshare_core::Book>| -> Vec<String> {
        books.into_iter().map(|b| b.isbn.to_string()).collect()
    };

    assert_eq!(listed(fx.library.get_all_books()), vec!["978-1"]);
    assert_eq!(listed(fx.library.get_books_by_genre("fantasy")), vec!["978-1"]);
    assert_eq!(
        listed(fx.library.get_books_by_author("octavia e. butler")),
        vec!["978-1"]
    );
    let trending: Vec<String> = fx
        .library
        .get_trending_books(10)
        .into_iter()
        .map(|t| t.book.isbn.to_string())
        .collect();
    assert_eq!(trending, vec!["978-1"]);

    // Admin views see the rest
    assert_eq!(
        listed(fx.library.get_pending_submissions(&fx.admin).unwrap()),
        vec!["978-2"]
    );
    assert_eq!(
        listed(
            fx.library
                .get_books_by_status(&fx.admin, StatusKind::Rejected)
                .unwrap()
        ),
        vec!["978-3"]
    );
    assert!(matches!(
        fx.library.get_pending_submissions(&fx.reader),
        Err(LibraryError::Unauthorized(_))
    ));

    // Authors always see their own uploads
    assert_eq!(fx.library.get_my_submissions(&fx.author).len(), 3);
}

// =============================================================================
// Approval and edit gate
// =============================================================================

#[tokio::test]
async fn test_approval_and_edit_escalation_scenario() {
    let fx = Fixture::new();
    let isbn = fx.submit("978-0", "Fantasy", 200).await;
    assert_eq!(
        fx.library.get_book(&fx.author, &isbn).unwrap().approval_status,
        ApprovalStatus::Pending
    );

    fx.library
        .approve_book_submission(&fx.admin, &isbn, true, None)
        .await
        .unwrap();
    assert_eq!(
        fx.library
            .get_book(&Principal::anonymous(), &isbn)
            .unwrap()
            .approval_status,
        ApprovalStatus::Approved
    );

    for n in 1..=3u32 {
        let book = fx
            .library
            .update_book(&fx.author, &isbn, details(&format!("Edit {}", n), "Fantasy", 200))
            .await
            .unwrap();
        assert_eq!(book.edit_count, n);
    }

    let err = fx
        .library
        .update_book(&fx.author, &isbn, details("Edit 4", "Fantasy", 200))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::EditLimitExceeded { .. }));
    let book = fx.library.get_book(&fx.author, &isbn).unwrap();
    assert_eq!(book.edit_count, 3);
    assert_eq!(book.details.title, "Edit 3");
    assert_eq!(book.approval_status, ApprovalStatus::Approved);

    fx.library
        .request_more_edits(&fx.author, &isbn, Some("Found a typo".to_string()))
        .await
        .unwrap();
    let requests = fx.library.get_edit_requests(&fx.author, &isbn).unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message.as_deref(), Some("Found a typo"));
}

#[tokio::test]
async fn test_rejection_reason_defaults() {
    let fx = Fixture::new();
    let isbn = fx.submit("978-0", "Fantasy", 200).await;

    let book = fx
        .library
        .approve_book_submission(&fx.admin, &isbn, false, None)
        .await
        .unwrap();
    assert_eq!(
        book.approval_status,
        ApprovalStatus::Rejected {
            reason: "No reason provided".to_string()
        }
    );
}

#[tokio::test]
async fn test_reapproval_is_idempotent() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;
    let again = fx
        .library
        .approve_book_submission(&fx.admin, &isbn, true, None)
        .await
        .unwrap();
    assert_eq!(again.approval_status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn test_decision_is_final_until_resubmitted() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;

    let err = fx
        .library
        .approve_book_submission(&fx.admin, &isbn, false, Some("Too late".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::InvalidInput(_)));
    assert_eq!(
        fx.library.get_book(&fx.admin, &isbn).unwrap().approval_status,
        ApprovalStatus::Approved
    );

    let rejected = fx.submit("978-1", "Fantasy", 200).await;
    fx.library
        .approve_book_submission(&fx.admin, &rejected, false, None)
        .await
        .unwrap();
    assert!(fx
        .library
        .approve_book_submission(&fx.admin, &rejected, true, None)
        .await
        .is_err());

    fx.library
        .update_book(&fx.author, &rejected, details("Second try", "Fantasy", 200))
        .await
        .unwrap();
    let book = fx
        .library
        .approve_book_submission(&fx.admin, &rejected, true, None)
        .await
        .unwrap();
    assert_eq!(book.approval_status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn test_only_admin_reviews() {
    let fx = Fixture::new();
    let pending = fx.submit("978-0", "Fantasy", 200).await;

    let err = fx
        .library
        .approve_book_submission(&fx.author, &pending, true, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Unauthorized(_)));
    assert_eq!(
        fx.library.get_book(&fx.admin, &pending).unwrap().approval_status,
        ApprovalStatus::Pending
    );

    let err = fx
        .library
        .approve_book_submission(&fx.admin, &isbn("978-404"), true, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::NotFound(_)));
}

#[tokio::test]
async fn test_only_uploader_or_admin_edits() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;

    let err = fx
        .library
        .update_book(&fx.reader, &isbn, details("Vandalised", "Fantasy", 200))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Unauthorized(_)));

    // Admin edits skip the counter
    let book = fx
        .library
        .update_book(&fx.admin, &isbn, details("Corrected", "Fantasy", 200))
        .await
        .unwrap();
    assert_eq!(book.edit_count, 0);
    assert_eq!(book.details.title, "Corrected");
}

#[tokio::test]
async fn test_grant_reopens_editing() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;
    for n in 0..3 {
        fx.library
            .update_book(&fx.author, &isbn, details(&format!("v{}", n), "Fantasy", 200))
            .await
            .unwrap();
    }
    fx.library
        .request_more_edits(&fx.author, &isbn, None)
        .await
        .unwrap();

    // Clearing alone does not raise the ceiling
    let cleared = fx
        .library
        .clear_edit_requests(&fx.admin, &isbn)
        .await
        .unwrap();
    assert_eq!(cleared.len(), 1);
    assert!(matches!(
        fx.library
            .update_book(&fx.author, &isbn, details("v3", "Fantasy", 200))
            .await,
        Err(LibraryError::EditLimitExceeded { .. })
    ));

    fx.library
        .request_more_edits(&fx.author, &isbn, None)
        .await
        .unwrap();
    let book = fx
        .library
        .grant_additional_edits(&fx.admin, &isbn, 1)
        .await
        .unwrap();
    assert_eq!(book.edit_allowance, 4);
    assert!(fx
        .library
        .get_edit_requests(&fx.admin, &isbn)
        .unwrap()
        .is_empty());

    let book = fx
        .library
        .update_book(&fx.author, &isbn, details("v3", "Fantasy", 200))
        .await
        .unwrap();
    assert_eq!(book.edit_count, 4);
}

#[tokio::test]
async fn test_rejected_book_requeued_by_author_edit() {
    let fx = Fixture::new();
    let isbn = fx.submit("978-0", "Fantasy", 200).await;
    fx.library
        .approve_book_submission(&fx.admin, &isbn, false, Some("Missing cover".to_string()))
        .await
        .unwrap();

    let book = fx
        .library
        .update_book(&fx.author, &isbn, details("With cover", "Fantasy", 200))
        .await
        .unwrap();
    assert_eq!(book.approval_status, ApprovalStatus::Pending);
}

// =============================================================================
// Engagement
// =============================================================================

#[tokio::test]
async fn test_rating_upsert() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;

    fx.library.add_rating(&fx.reader, &isbn, 3).await.unwrap();
    fx.library.add_rating(&fx.reader, &isbn, 5).await.unwrap();

    let ratings = fx.library.get_book_ratings(&isbn);
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].stars, 5);
    assert_eq!(ratings[0].user, fx.reader);
}

#[tokio::test]
async fn test_rating_bounds() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;

    for stars in [0u8, 6, 255] {
        assert_eq!(
            fx.library.add_rating(&fx.reader, &isbn, stars).await,
            Err(LibraryError::InvalidRating(stars.to_string()))
        );
    }
    assert!(fx.library.get_book_ratings(&isbn).is_empty());
}

#[tokio::test]
async fn test_average_rating_scenario() {
    let fx = Fixture::new();
    let rated = fx.publish("978-0", "Fantasy", 200).await;
    let unrated = fx.publish("978-1", "Fantasy", 200).await;

    fx.library.add_rating(&fx.reader, &rated, 4).await.unwrap();
    fx.library.add_rating(&fx.admin, &rated, 5).await.unwrap();

    assert_eq!(fx.library.get_book_average_rating(&rated), Some(4.5));
    assert_eq!(fx.library.get_book_average_rating(&unrated), None);
}

#[tokio::test]
async fn test_engagement_requires_listed_book_and_account() {
    let fx = Fixture::new();
    let pending = fx.submit("978-0", "Fantasy", 200).await;
    let listed = fx.publish("978-1", "Fantasy", 200).await;

    assert!(matches!(
        fx.library.add_rating(&fx.reader, &pending, 4).await,
        Err(LibraryError::NotFound(_))
    ));
    assert!(matches!(
        fx.library.toggle_bookmark(&fx.reader, &isbn("978-404")).await,
        Err(LibraryError::NotFound(_))
    ));
    assert!(matches!(
        fx.library.add_rating(&Principal::anonymous(), &listed, 4).await,
        Err(LibraryError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_progress_bounds() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;

    let err = fx
        .library
        .update_reading_progress(&fx.reader, &isbn, 201)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LibraryError::InvalidProgress {
            pages_read: "201".to_string(),
            page_count: 200
        }
    );
    assert!(fx.library.get_user_book_progress(&fx.reader, &isbn).is_err());

    fx.library
        .update_reading_progress(&fx.reader, &isbn, 150)
        .await
        .unwrap();
    assert_eq!(
        fx.library
            .get_user_book_progress(&fx.reader, &isbn)
            .unwrap()
            .pages_read,
        150
    );

    // Progress may go backwards
    fx.library
        .update_reading_progress(&fx.reader, &isbn, 20)
        .await
        .unwrap();
    assert_eq!(
        fx.library
            .get_user_book_progress(&fx.reader, &isbn)
            .unwrap()
            .pages_read,
        20
    );
    assert_eq!(fx.library.get_all_user_progress(&fx.reader).len(), 1);
}

#[tokio::test]
async fn test_progress_checks_current_page_count() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;
    fx.library
        .update_book(&fx.author, &isbn, details("Expanded", "Fantasy", 400))
        .await
        .unwrap();

    fx.library
        .update_reading_progress(&fx.reader, &isbn, 350)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_bookmark_toggle_twice() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;
    assert!(!fx.library.is_book_bookmarked(&fx.reader, &isbn));

    assert!(fx.library.toggle_bookmark(&fx.reader, &isbn).await.unwrap());
    assert!(fx.library.is_book_bookmarked(&fx.reader, &isbn));
    assert_eq!(fx.library.get_bookmarked_books(&fx.reader).len(), 1);

    assert!(!fx.library.toggle_bookmark(&fx.reader, &isbn).await.unwrap());
    assert!(!fx.library.is_book_bookmarked(&fx.reader, &isbn));
    assert!(fx.library.get_bookmarked_books(&fx.reader).is_empty());
}

// =============================================================================
// Deletion
// =============================================================================

#[tokio::test]
async fn test_delete_cascades_engagement() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;
    let kept = fx.publish("978-1", "Fantasy", 200).await;
    let others = [fx.reader.clone(), fx.user("carol"), fx.user("dave")];

    for (i, user) in others.iter().enumerate() {
        fx.library.add_rating(user, &isbn, 3 + i as u8).await.unwrap();
        fx.library.toggle_bookmark(user, &isbn).await.unwrap();
        fx.library
            .update_reading_progress(user, &isbn, 10 * i as u32)
            .await
            .unwrap();
    }
    fx.library.add_rating(&fx.reader, &kept, 2).await.unwrap();

    fx.library.delete_book(&fx.author, &isbn).await.unwrap();

    assert!(matches!(
        fx.library.get_book(&fx.admin, &isbn),
        Err(LibraryError::NotFound(_))
    ));
    assert!(fx.library.get_book_ratings(&isbn).is_empty());
    assert_eq!(fx.library.get_book_average_rating(&isbn), None);
    for user in &others {
        assert!(!fx.library.is_book_bookmarked(user, &isbn));
        assert!(matches!(
            fx.library.get_user_book_progress(user, &isbn),
            Err(LibraryError::NotFound(_))
        ));
    }
    assert_eq!(fx.library.get_book_ratings(&kept).len(), 1);
    assert!(fx.library.snapshot().violations().is_empty());

    // The ISBN is free again
    fx.submit("978-0", "Fantasy", 200).await;
}

#[tokio::test]
async fn test_delete_authorization() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;

    assert!(matches!(
        fx.library.delete_book(&fx.reader, &isbn).await,
        Err(LibraryError::Unauthorized(_))
    ));
    assert!(fx.library.get_book(&fx.reader, &isbn).is_ok());

    fx.library.delete_book(&fx.admin, &isbn).await.unwrap();
    assert!(matches!(
        fx.library.delete_book(&fx.admin, &isbn).await,
        Err(LibraryError::NotFound(_))
    ));
}

// =============================================================================
// Roles
// =============================================================================

#[tokio::test]
async fn test_role_axes_are_independent() {
    let fx = Fixture::new();
    fx.library.promote_to_author(&fx.admin, &fx.admin).unwrap();

    let role = fx.library.get_user_role(&fx.admin);
    assert!(role.is_admin());
    assert!(role.is_author);

    let role = fx
        .library
        .assign_caller_user_role(&fx.admin, &fx.reader, SystemRole::Admin)
        .unwrap();
    assert!(role.is_admin());
    assert!(!role.is_author);

    assert!(matches!(
        fx.library.promote_to_author(&fx.author, &fx.author),
        Err(LibraryError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_edit_requests_visibility() {
    let fx = Fixture::new();
    let isbn = fx.publish("978-0", "Fantasy", 200).await;

    assert!(matches!(
        fx.library.get_edit_requests(&fx.reader, &isbn),
        Err(LibraryError::Unauthorized(_))
    ));
    assert!(matches!(
        fx.library.get_all_edit_requests(&fx.author),
        Err(LibraryError::Unauthorized(_))
    ));
    assert!(fx.library.get_all_edit_requests(&fx.admin).unwrap().is_empty());
}
