mod concurrent_set_case1;
mod versioning_case1;
