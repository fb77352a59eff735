fn main() {
    std::process::exit(todoscan::app::startup::run());
}
