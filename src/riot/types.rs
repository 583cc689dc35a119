use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Summoner profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Summoner {
  pub id: i64,
  pub name: String,
  pub profile_icon_id: i64,
  /// Epoch milliseconds of the last profile change
  pub revision_date: i64,
  pub summoner_level: i64,
}

/// Full match details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchDetail {
  pub match_id: i64,
  pub map_id: i64,
  /// Epoch milliseconds when the lobby was created
  pub match_creation: i64,
  /// Seconds
  pub match_duration: i64,
  pub match_mode: String,
  pub match_type: String,
  pub match_version: String,
  pub platform_id: String,
  pub queue_type: String,
  pub region: String,
  pub season: String,
  pub participant_identities: Vec<ParticipantIdentity>,
  pub participants: Vec<Participant>,
}

impl MatchDetail {
  /// Summoner ids of every identified player in the match.
  pub fn summoner_ids(&self) -> BTreeSet<i64> {
    self
      .participant_identities
      .iter()
      .filter_map(|identity| identity.player.as_ref())
      .map(|player| player.summoner_id)
      .filter(|id| *id != 0)
      .collect()
  }

  /// Participant entry for a summoner, if they played in this match.
  pub fn participant_for(&self, summoner_id: i64) -> Option<&Participant> {
    let participant_id = self
      .participant_identities
      .iter()
      .find(|identity| {
        identity
          .player
          .as_ref()
          .is_some_and(|player| player.summoner_id == summoner_id)
      })?
      .participant_id;

    self
      .participants
      .iter()
      .find(|p| p.participant_id == participant_id)
  }
}

/// Links a participant slot to a player (absent in anonymized matches)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantIdentity {
  pub participant_id: i64,
  pub player: Option<Player>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Player {
  pub summoner_id: i64,
  pub summoner_name: String,
  pub profile_icon: i64,
  pub match_history_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Participant {
  pub participant_id: i64,
  pub champion_id: i64,
  pub team_id: i64,
  pub spell1_id: i64,
  pub spell2_id: i64,
  pub highest_achieved_season_tier: String,
  pub stats: Option<ParticipantStats>,
}

/// End-of-game statistics (subset)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantStats {
  pub winner: bool,
  pub kills: i64,
  pub deaths: i64,
  pub assists: i64,
  pub champ_level: i64,
  pub gold_earned: i64,
  pub minions_killed: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  const MATCH_JSON: &str = r#"{
    "matchId": 1900729148,
    "mapId": 11,
    "matchMode": "CLASSIC",
    "queueType": "RANKED_SOLO_5x5",
    "participantIdentities": [
      {"participantId": 1, "player": {"summonerId": 22, "summonerName": "alpha"}},
      {"participantId": 2, "player": {"summonerId": 33, "summonerName": "beta"}},
      {"participantId": 3}
    ],
    "participants": [
      {"participantId": 1, "championId": 64, "teamId": 100, "stats": {"winner": true, "kills": 7}},
      {"participantId": 2, "championId": 99, "teamId": 200}
    ]
  }"#;

  #[test]
  fn test_parse_api_json() {
    let detail: MatchDetail = serde_json::from_str(MATCH_JSON).unwrap();
    assert_eq!(detail.match_id, 1900729148);
    assert_eq!(detail.queue_type, "RANKED_SOLO_5x5");
    assert_eq!(detail.participants.len(), 2);
    assert_eq!(detail.season, "");
  }

  #[test]
  fn test_summoner_ids_skip_anonymous() {
    let detail: MatchDetail = serde_json::from_str(MATCH_JSON).unwrap();
    assert_eq!(detail.summoner_ids().into_iter().collect::<Vec<_>>(), vec![22, 33]);
  }

  #[test]
  fn test_participant_for() {
    let detail: MatchDetail = serde_json::from_str(MATCH_JSON).unwrap();
    let participant = detail.participant_for(22).unwrap();
    assert_eq!(participant.champion_id, 64);
    assert!(participant.stats.as_ref().unwrap().winner);
    assert!(detail.participant_for(44).is_none());
  }

  #[test]
  fn test_summoner_serializes_camel_case() {
    let summoner = Summoner {
      id: 1,
      name: "x".into(),
      summoner_level: 30,
      ..Default::default()
    };
    let value = serde_json::to_value(&summoner).unwrap();
    assert_eq!(value["summonerLevel"], 30);
    assert_eq!(value["id"], 1);
  }
}
