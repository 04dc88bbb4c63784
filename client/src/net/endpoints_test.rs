use super::*;

#[test]
fn plain_ids_are_unchanged() {
    assert_eq!(team("101"), "/api/teams/101");
    assert_eq!(team_members("101"), "/api/teams/101/members");
    assert_eq!(team_member("101", "7"), "/api/teams/101/members/7");
    assert_eq!(user("1"), "/api/users/1");
}

#[test]
fn ids_stay_within_one_segment() {
    assert_eq!(team("101/members/1"), "/api/teams/101%2Fmembers%2F1");
    assert_eq!(team_member("101", "../1"), "/api/teams/101/members/..%2F1");
    assert_eq!(user("a b?x=1#y"), "/api/users/a%20b%3Fx%3D1%23y");
}
