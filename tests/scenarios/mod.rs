mod artifacts;
mod conditions;
mod end_to_end;
mod gating;
