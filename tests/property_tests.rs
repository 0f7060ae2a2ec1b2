//! Property-based tests for URL parsing, platform detection, and name
//! validation.

use proptest::prelude::*;
use scmkit::core::types::{BranchName, Oid};
use scmkit::forge::{parse_gitlab_locator, parse_locator, scm_kind_from_url, ScmKind};

fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-][A-Za-z0-9_.-]{0,19}"
}

fn host() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}\\.(com|org|io)"
}

proptest! {
    #[test]
    fn well_formed_urls_yield_owner_and_repo(
        scheme in prop_oneof![Just("https"), Just("http"), Just("HTTPS")],
        host in host(),
        owner in segment(),
        repo in segment(),
        git_suffix in any::<bool>(),
        trailing_slash in any::<bool>(),
    ) {
        prop_assume!(!repo.to_ascii_lowercase().ends_with(".git"));

        let url = format!(
            "{scheme}://{host}/{owner}/{repo}{}{}",
            if git_suffix { ".git" } else { "" },
            if trailing_slash { "/" } else { "" },
        );
        let locator = parse_locator(&url).unwrap();
        prop_assert_eq!(locator.owner, owner);
        prop_assert_eq!(locator.repo, repo);
    }

    #[test]
    fn extra_segments_are_rejected(
        host in host(),
        segments in prop::collection::vec(segment(), 3..6),
    ) {
        let url = format!("https://{host}/{}", segments.join("/"));
        prop_assert!(parse_locator(&url).is_err());
    }

    #[test]
    fn double_trailing_slash_is_rejected(host in host(), owner in segment(), repo in segment()) {
        let url = format!("https://{host}/{owner}/{repo}//");
        prop_assert!(parse_locator(&url).is_err());
    }

    #[test]
    fn gitlab_namespace_is_everything_but_the_last_segment(
        segments in prop::collection::vec(segment(), 2..6),
    ) {
        let project = segments.last().cloned().unwrap_or_default();
        prop_assume!(!project.to_ascii_lowercase().ends_with(".git"));

        let url = format!("https://gitlab.com/{}", segments.join("/"));
        let locator = parse_gitlab_locator(&url).unwrap();
        prop_assert_eq!(locator.full_path(), segments.join("/"));
        prop_assert_eq!(locator.repo, project);
    }

    #[test]
    fn platform_detection_ignores_case(path in "[a-z]{1,10}/[a-z]{1,10}", upper in any::<bool>()) {
        let github = format!("https://github.com/{path}");
        let gitlab = format!("https://gitlab.com/{path}");
        let (github, gitlab) = if upper {
            (github.to_uppercase(), gitlab.to_uppercase())
        } else {
            (github, gitlab)
        };
        prop_assert_eq!(scm_kind_from_url(Some(&github)), Some(ScmKind::GitHub));
        prop_assert_eq!(scm_kind_from_url(Some(&gitlab)), Some(ScmKind::GitLab));
    }

    #[test]
    fn simple_branch_names_are_valid(
        name in "[a-z][a-z0-9_-]{0,20}(/[a-z0-9][a-z0-9_-]{0,10}){0,3}",
    ) {
        prop_assert!(BranchName::new(name.clone()).is_ok(), "rejected {}", name);
    }

    #[test]
    fn branch_names_with_forbidden_characters_are_invalid(
        prefix in "[a-z]{1,8}",
        bad in prop_oneof![
            Just(" "),
            Just("~"),
            Just("^"),
            Just(":"),
            Just("?"),
            Just("*"),
            Just("["),
            Just(".."),
        ],
        suffix in "[a-z]{1,8}",
    ) {
        let name = format!("{prefix}{bad}{suffix}");
        prop_assert!(BranchName::new(name).is_err());
    }

    #[test]
    fn full_hex_ids_are_valid_oids(hex in "[0-9a-fA-F]{40}") {
        let oid = Oid::new(hex.clone()).unwrap();
        prop_assert_eq!(oid.as_str(), hex.to_ascii_lowercase());
    }
}
