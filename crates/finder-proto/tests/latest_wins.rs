mod common;

use common::{page_of, titles};
use finder_proto::protocol::{ChannelKind, ChannelStatus, FetchError};
use finder_proto::state::{ChannelState, Resolution};

#[test]
fn older_response_arriving_late_never_overwrites_newer() {
    let mut ch = ChannelState::new("programs", Some(ChannelKind::Programs));
    let cat = ch.begin("cat", 0);
    let cats = ch.begin("cats", 0);
    assert_eq!((cat.seq, cats.seq), (1, 2));

    assert_eq!(ch.resolve(cats.seq, Ok(page_of(&["cats"]))), Resolution::Applied);
    assert_eq!(ch.resolve(cat.seq, Ok(page_of(&["cat"]))), Resolution::Superseded);

    assert_eq!(titles(ch.result().unwrap()), vec!["cats"]);
    assert_eq!(ch.last_applied(), 2);
}

#[test]
fn older_response_arriving_first_is_dropped_and_loading_stays() {
    let mut ch = ChannelState::new("news", Some(ChannelKind::News));
    let first = ch.begin("cat", 0);
    let second = ch.begin("cats", 0);

    assert_eq!(ch.resolve(first.seq, Ok(page_of(&["cat"]))), Resolution::Superseded);
    // Superseded is invisible: still waiting on the winner
    assert!(ch.loading());
    assert_eq!(ch.status(), ChannelStatus::Loading);
    assert!(ch.result().is_none());

    ch.resolve(second.seq, Ok(page_of(&["cats"])));
    assert!(!ch.loading());
    assert_eq!(titles(ch.result().unwrap()), vec!["cats"]);
}

#[test]
fn stale_error_does_not_flag_channel() {
    let mut ch = ChannelState::new("images", Some(ChannelKind::Images));
    let first = ch.begin("arena", 0);
    let second = ch.begin("arenas", 0);

    assert_eq!(
        ch.resolve(first.seq, Err(FetchError::Transport("reset".into()))),
        Resolution::Superseded
    );
    assert!(!ch.error());

    ch.resolve(second.seq, Ok(page_of(&["arena"])));
    assert_eq!(ch.status(), ChannelStatus::Applied);
}

#[test]
fn channels_do_not_interact() {
    let mut programs = ChannelState::new("programs", Some(ChannelKind::Programs));
    let mut news = ChannelState::new("news", Some(ChannelKind::News));

    let p = programs.begin("biology", 0);
    let n = news.begin("biology", 0);
    assert_eq!((p.seq, n.seq), (1, 1));

    news.resolve(
        n.seq,
        Err(FetchError::Status {
            status: 500,
            url: "news".into(),
        }),
    );
    programs.resolve(p.seq, Ok(page_of(&["Biology BS"])));

    assert!(news.error());
    assert!(!programs.error());
    assert_eq!(titles(programs.result().unwrap()), vec!["Biology BS"]);
}

#[test]
fn many_out_of_order_responses_only_last_issued_wins() {
    let mut ch = ChannelState::new("jobs", Some(ChannelKind::Jobs));
    let queries = ["nu", "nur", "nurs", "nurse", "nurses"];
    let issued: Vec<_> = queries.iter().map(|q| ch.begin(q, 0)).collect();

    // Deliver in reverse: the newest first, then every older one
    let mut applied = 0;
    for req in issued.iter().rev() {
        if ch.resolve(req.seq, Ok(page_of(&[req.query.as_str()]))) == Resolution::Applied {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(titles(ch.result().unwrap()), vec!["nurses"]);
}
