mod helpers;
mod schedule_test;
