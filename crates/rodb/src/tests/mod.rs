mod helpers;

mod dump_tests;
