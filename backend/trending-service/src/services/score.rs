use crate::models::EngagementCounters;

pub const VIEW_WEIGHT: f64 = 1.0;
pub const LIKE_WEIGHT: f64 = 2.0;
pub const COMMENT_WEIGHT: f64 = 3.0;

/// Weighted engagement score, clamped at zero since counters can briefly go
/// negative when a delete is processed before its create.
pub fn calculate_engagement_score(views: i64, likes: i64, comments: i64) -> f64 {
    let score = views as f64 * VIEW_WEIGHT
        + likes as f64 * LIKE_WEIGHT
        + comments as f64 * COMMENT_WEIGHT;

    score.max(0.0)
}

pub fn engagement_score(counters: &EngagementCounters) -> f64 {
    calculate_engagement_score(counters.views, counters.likes, counters.comments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_counters_score_zero() {
        assert_eq!(calculate_engagement_score(0, 0, 0), 0.0);
    }

    #[test]
    fn test_weighted_sum() {
        for (views, likes, comments) in [(1, 0, 0), (0, 1, 0), (0, 0, 1), (7, 3, 2), (1000, 250, 40)] {
            let expected = (views + 2 * likes + 3 * comments) as f64;
            assert_eq!(calculate_engagement_score(views, likes, comments), expected);
        }
    }

    #[test]
    fn test_negative_sum_is_clamped() {
        assert_eq!(calculate_engagement_score(0, -1, 0), 0.0);
        assert_eq!(calculate_engagement_score(2, 0, -5), 0.0);
    }

    #[test]
    fn test_partial_negative_counter_still_counts_rest() {
        assert_eq!(calculate_engagement_score(10, -1, 0), 8.0);
    }

    #[test]
    fn test_engagement_score_from_counters() {
        let counters = EngagementCounters::new(0, 1, 0);
        assert_eq!(engagement_score(&counters), 2.0);
    }
}
