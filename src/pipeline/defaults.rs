use crate::alignment::timestamps::join_timestamps;
use crate::pipeline::traits::TimestampAligner;
use crate::types::Token;

pub struct DurationTimestampAligner;

impl TimestampAligner for DurationTimestampAligner {
    fn align(&self, tokens: &mut [Token], pred_dur: &[u32]) -> usize {
        join_timestamps(tokens, pred_dur)
    }
}
